// Shared helpers for timestamps and durations.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

pub fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}

/// Local clock minus a server timestamp. Diagnostic only; nothing is timed from it.
/// `None` when the difference does not fit an `i64`.
pub fn clock_skew_ms(remote_ts_ms: u64) -> Option<i64> {
    skew_between(now_epoch_ms(), remote_ts_ms)
}

fn skew_between(local_ms: u64, remote_ms: u64) -> Option<i64> {
    i64::try_from(i128::from(local_ms) - i128::from(remote_ms)).ok()
}
