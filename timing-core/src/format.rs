// Display formatting for elapsed times, averages and ranks.
// Invariants: integer floor division only; missing or negative input renders as zero.

pub const ZERO_ELAPSED: &str = "00:00.000";
pub const UNKNOWN_RANK: &str = "N/A";
pub const UNKNOWN_AVERAGE: &str = "-";

/// Formats a duration as `MM:SS.mmm`. Minutes widen past 99 instead of wrapping.
pub fn format_elapsed(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
}

/// Lenient variant for untrusted input.
pub fn format_elapsed_signed(ms: Option<i64>) -> String {
    match ms.and_then(|value| u64::try_from(value).ok()) {
        Some(ms) => format_elapsed(ms),
        None => ZERO_ELAPSED.to_string(),
    }
}

pub fn format_average_secs(avg_ms: Option<f64>) -> String {
    match avg_ms {
        Some(ms) if ms.is_finite() && ms >= 0.0 => format!("{:.2}", ms / 1000.0),
        _ => UNKNOWN_AVERAGE.to_string(),
    }
}

pub fn format_rank(rank: Option<u32>) -> String {
    match rank {
        Some(rank) => rank.to_string(),
        None => UNKNOWN_RANK.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_fixed_width() {
        assert_eq!(format_elapsed(0), "00:00.000");
        assert_eq!(format_elapsed(7), "00:00.007");
        assert_eq!(format_elapsed(999), "00:00.999");
        assert_eq!(format_elapsed(1_000), "00:01.000");
        assert_eq!(format_elapsed(59_999), "00:59.999");
        assert_eq!(format_elapsed(60_000), "01:00.000");
        assert_eq!(format_elapsed(15_000), "00:15.000");
        assert_eq!(format_elapsed(3_599_999), "59:59.999");
        assert_eq!(format_elapsed(6_000_000), "100:00.000");
    }

    #[test]
    fn floors_instead_of_rounding() {
        for ms in (0..200_000u64).step_by(337) {
            let text = format_elapsed(ms);
            let (minutes, rest) = text.split_once(':').unwrap();
            let (seconds, millis) = rest.split_once('.').unwrap();
            let minutes: u64 = minutes.parse().unwrap();
            let seconds: u64 = seconds.parse().unwrap();
            let millis: u64 = millis.parse().unwrap();
            assert!(seconds < 60);
            assert_eq!(minutes * 60_000 + seconds * 1_000 + millis, ms, "{text}");
        }
    }

    #[test]
    fn negative_or_missing_is_zero() {
        assert_eq!(format_elapsed_signed(Some(-5)), ZERO_ELAPSED);
        assert_eq!(format_elapsed_signed(None), ZERO_ELAPSED);
        assert_eq!(format_elapsed_signed(Some(61_001)), "01:01.001");
    }

    #[test]
    fn average_and_rank_display() {
        assert_eq!(format_average_secs(Some(5000.0)), "5.00");
        assert_eq!(format_average_secs(Some(4876.0)), "4.88");
        assert_eq!(format_average_secs(None), UNKNOWN_AVERAGE);
        assert_eq!(format_average_secs(Some(f64::NAN)), UNKNOWN_AVERAGE);
        assert_eq!(format_rank(Some(1)), "1");
        assert_eq!(format_rank(None), UNKNOWN_RANK);
    }
}
