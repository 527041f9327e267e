// Resilient push-channel client: one live connection, one pending reconnect at most.
// Invariants: a new connection always aborts the previous reader and cancels the retry timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use timing_core::backoff::{ConnectionState, ConnectionStatus, ReconnectDecision, ReconnectPolicy};
use timing_core::model::StreamEvent;

use crate::scheduler::ScheduledTask;

mod channel;
pub use channel::{run_connection, ByteStream, EventChannel, HttpEventChannel, StreamSignal};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamUpdate {
    Opened,
    Event(StreamEvent),
    RetryScheduled { attempt: u32, delay_ms: u64 },
    Exhausted { attempts: u32 },
}

#[derive(Debug)]
struct ActiveConnection {
    id: u64,
    handle: JoinHandle<()>,
}

pub struct StreamClient<C> {
    channel: Arc<C>,
    connection: ConnectionState,
    active: Option<ActiveConnection>,
    reconnect: ScheduledTask,
    signal_tx: mpsc::Sender<StreamSignal>,
    next_conn_id: u64,
}

impl<C: EventChannel> StreamClient<C> {
    pub fn new(channel: Arc<C>, policy: ReconnectPolicy, signal_tx: mpsc::Sender<StreamSignal>) -> Self {
        Self {
            channel,
            connection: ConnectionState::new(policy),
            active: None,
            reconnect: ScheduledTask::new(),
            signal_tx,
            next_conn_id: 0,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.connection.reconnect_attempts()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect.is_pending()
    }

    pub fn connect(&mut self) {
        self.reconnect.cancel();
        self.abort_active();
        self.next_conn_id += 1;
        let id = self.next_conn_id;
        self.connection.connecting();
        debug!(conn = id, attempt = self.connection.reconnect_attempts(), "opening event stream");
        let handle = tokio::spawn(run_connection(id, self.channel.clone(), self.signal_tx.clone()));
        self.active = Some(ActiveConnection { id, handle });
    }

    /// Explicit user reconnect, also the only way out of `Exhausted`.
    pub fn reconnect_now(&mut self) {
        self.connection.clear_attempts();
        self.connect();
    }

    /// Returns true when focus triggered an early reconnect.
    pub fn focus_regained(&mut self) -> bool {
        if self.connection.status() != ConnectionStatus::Closed {
            return false;
        }
        info!("focus regained with stream closed, reconnecting");
        self.connect();
        true
    }

    /// Completes when the pending backoff elapses. Caller follows with `connect`.
    pub async fn reconnect_due(&mut self) {
        self.reconnect.fired().await
    }

    pub fn handle_signal(&mut self, signal: StreamSignal) -> Option<StreamUpdate> {
        let current = self.active.as_ref().map(|active| active.id);
        match signal {
            StreamSignal::Opened { conn } if Some(conn) == current => {
                self.connection.opened();
                info!(conn, "event stream open");
                Some(StreamUpdate::Opened)
            }
            StreamSignal::Event { conn, event } if Some(conn) == current => {
                if event == StreamEvent::KeepAlive {
                    trace!(conn, "keep-alive");
                    return None;
                }
                Some(StreamUpdate::Event(event))
            }
            StreamSignal::Closed { conn, reason } if Some(conn) == current => {
                self.active = None;
                warn!(conn, reason = %reason, "event stream closed");
                match self.connection.failed() {
                    ReconnectDecision::Retry { attempt, delay_ms } => {
                        self.reconnect.schedule(Duration::from_millis(delay_ms));
                        info!(attempt, delay_ms, "reconnect scheduled");
                        Some(StreamUpdate::RetryScheduled { attempt, delay_ms })
                    }
                    ReconnectDecision::GiveUp { attempts } => {
                        warn!(attempts, "reconnect attempts exhausted");
                        Some(StreamUpdate::Exhausted { attempts })
                    }
                }
            }
            stale => {
                debug!(?stale, "signal from superseded connection");
                None
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.reconnect.cancel();
        self.abort_active();
    }

    fn abort_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.handle.abort();
        }
    }
}

impl<C> Drop for StreamClient<C> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.handle.abort();
        }
    }
}
