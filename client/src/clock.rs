// Live race clock interpolated from a local monotonic anchor.
// Invariants: one ticker at most; elapsed time never reads the remote timestamp.

use std::future;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::utils::duration_ms;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockAnchor {
    /// Logical origin as reported by the server. Informational only.
    pub remote_start_ts_ms: u64,
    pub local_started_at: Instant,
}

#[derive(Debug)]
pub struct LiveClock {
    period: Duration,
    anchor: Option<ClockAnchor>,
    ticker: Option<Interval>,
    last_elapsed_ms: u64,
}

impl LiveClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            anchor: None,
            ticker: None,
            last_elapsed_ms: 0,
        }
    }

    /// Starts or restarts the clock. The previous ticker is dropped before the new one exists.
    pub fn start(&mut self, remote_start_ts_ms: u64) {
        self.ticker = None;
        let now = Instant::now();
        let mut ticker = time::interval_at(now + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.anchor = Some(ClockAnchor {
            remote_start_ts_ms,
            local_started_at: now,
        });
        self.ticker = Some(ticker);
        self.last_elapsed_ms = 0;
    }

    /// Stops ticking and returns the last displayed value, which the display stays locked at.
    pub fn stop(&mut self) -> u64 {
        self.ticker = None;
        self.anchor = None;
        self.last_elapsed_ms
    }

    pub fn reset(&mut self) {
        self.ticker = None;
        self.anchor = None;
        self.last_elapsed_ms = 0;
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn anchor(&self) -> Option<ClockAnchor> {
        self.anchor
    }

    pub fn elapsed_ms(&self) -> u64 {
        match self.anchor {
            Some(anchor) => duration_ms(anchor.local_started_at.elapsed()),
            None => self.last_elapsed_ms,
        }
    }

    /// Waits for the next tick and returns the elapsed time. Pending forever while stopped.
    pub async fn tick(&mut self) -> u64 {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
                self.last_elapsed_ms = self.elapsed_ms();
                self.last_elapsed_ms
            }
            None => future::pending().await,
        }
    }
}
