// Post-race result fetching and display shaping.
// Invariants: one settle timer at most; rank and average are shown as returned, never derived.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use timing_core::format::{format_average_secs, format_rank, UNKNOWN_AVERAGE};
use timing_core::model::{LeaderboardEntry, RaceResult};

use crate::error::ClientError;
use crate::http::RaceApi;
use crate::scheduler::ScheduledTask;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultView {
    pub driver: String,
    pub average: String,
    pub rank: String,
}

impl From<&RaceResult> for ResultView {
    fn from(result: &RaceResult) -> Self {
        Self {
            driver: result.driver_name.clone().unwrap_or_default(),
            average: format_average_secs(result.average_lap_ms),
            rank: format_rank(result.rank),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub rank: String,
    pub name: String,
    pub laps: u32,
    pub average: String,
}

impl From<&LeaderboardEntry> for LeaderboardRow {
    fn from(entry: &LeaderboardEntry) -> Self {
        let average = match entry.avg_lap_time_sec {
            Some(secs) if secs.is_finite() && secs >= 0.0 => format!("{:.2}", secs),
            _ => UNKNOWN_AVERAGE.to_string(),
        };
        Self {
            rank: format_rank(entry.rank),
            name: entry.name.clone(),
            laps: entry.laps,
            average,
        }
    }
}

#[derive(Debug)]
pub struct ResultReport {
    pub result: Result<RaceResult, ClientError>,
    pub leaderboard: Result<Vec<LeaderboardEntry>, ClientError>,
}

/// Fetches the finished race and the refreshed leaderboard concurrently.
pub async fn fetch_report(api: &RaceApi) -> ResultReport {
    let (result, leaderboard) = tokio::join!(api.fetch_result(), api.fetch_leaderboard());
    ResultReport { result, leaderboard }
}

#[derive(Debug)]
pub struct ResultReporter {
    settle: ScheduledTask,
    delay: Duration,
    pending_epoch: Option<u64>,
}

impl ResultReporter {
    pub fn new(delay: Duration) -> Self {
        Self {
            settle: ScheduledTask::new(),
            delay,
            pending_epoch: None,
        }
    }

    /// Arms the settle delay for the race that finished at `epoch`.
    pub fn schedule(&mut self, epoch: u64) {
        debug!(epoch, delay_ms = self.delay.as_millis() as u64, "result fetch scheduled");
        self.pending_epoch = Some(epoch);
        self.settle.schedule(self.delay);
    }

    pub fn cancel(&mut self) -> bool {
        self.pending_epoch = None;
        self.settle.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.settle.is_pending()
    }

    /// Completes with the epoch the fetch was scheduled under.
    pub async fn settled(&mut self) -> Option<u64> {
        self.settle.fired().await;
        self.pending_epoch.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Instant};

    #[test]
    fn result_view_formats_server_values() {
        let result: RaceResult =
            serde_json::from_str(r#"{"name":"Kim","avg_lap_time":5000,"rank":1}"#).unwrap();
        assert_eq!(
            ResultView::from(&result),
            ResultView {
                driver: "Kim".to_string(),
                average: "5.00".to_string(),
                rank: "1".to_string(),
            }
        );
    }

    #[test]
    fn unknown_values_render_markers() {
        let result: RaceResult = serde_json::from_str(r#"{"name":"Kim","rank":"N/A"}"#).unwrap();
        let view = ResultView::from(&result);
        assert_eq!(view.rank, "N/A");
        assert_eq!(view.average, "-");
    }

    #[test]
    fn leaderboard_rows_keep_server_seconds() {
        let entry = LeaderboardEntry {
            rank: Some(2),
            name: "Lee".to_string(),
            laps: 3,
            avg_lap_time_sec: Some(5.12),
        };
        let row = LeaderboardRow::from(&entry);
        assert_eq!(row.average, "5.12");
        assert_eq!(row.rank, "2");
    }

    #[tokio::test(start_paused = true)]
    async fn settles_after_delay_with_epoch() {
        let mut reporter = ResultReporter::new(Duration::from_millis(500));
        let begin = Instant::now();
        reporter.schedule(7);
        assert_eq!(reporter.settled().await, Some(7));
        assert_eq!(begin.elapsed(), Duration::from_millis(500));
        assert!(!reporter.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_settlement() {
        let mut reporter = ResultReporter::new(Duration::from_millis(500));
        reporter.schedule(7);
        assert!(reporter.cancel());
        assert!(timeout(Duration::from_secs(2), reporter.settled()).await.is_err());
    }
}
