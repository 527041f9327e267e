// Single-slot scheduled task used for reconnect and result-settle timers.
// Invariants: at most one deadline is pending; scheduling replaces the previous one.

use std::future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{self, Sleep};

#[derive(Debug, Default)]
pub struct ScheduledTask {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ScheduledTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, delay: Duration) {
        self.sleep = Some(Box::pin(time::sleep(delay)));
    }

    /// Returns whether a pending deadline was dropped.
    pub fn cancel(&mut self) -> bool {
        self.sleep.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.sleep.is_some()
    }

    /// Completes once the pending deadline passes, then clears the slot.
    /// Never completes while nothing is scheduled, so it is safe inside `select!`.
    pub async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Instant};

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let mut task = ScheduledTask::new();
        let begin = Instant::now();
        task.schedule(Duration::from_millis(500));
        assert!(task.is_pending());
        task.fired().await;
        assert_eq!(begin.elapsed(), Duration::from_millis(500));
        assert!(!task.is_pending());
        assert!(timeout(Duration::from_secs(5), task.fired()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_replaces_pending_deadline() {
        let mut task = ScheduledTask::new();
        let begin = Instant::now();
        task.schedule(Duration::from_millis(100));
        task.schedule(Duration::from_millis(300));
        task.fired().await;
        assert_eq!(begin.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_clears_slot() {
        let mut task = ScheduledTask::new();
        assert!(!task.cancel());
        task.schedule(Duration::from_millis(100));
        assert!(task.cancel());
        assert!(timeout(Duration::from_secs(1), task.fired()).await.is_err());
    }
}
