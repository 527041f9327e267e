// Application context and the single event loop driving the race client.
// Invariants: handlers run one at a time; async completions re-check the epoch they were issued under.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use timing_core::format::{format_elapsed, ZERO_ELAPSED};
use timing_core::lifecycle::{LifecycleError, RaceState};
use timing_core::model::{LeaderboardEntry, ServerConfig, StreamEvent};
use timing_core::session::{ClockCommand, Ignored, RaceSession, SessionEvents};

use crate::clock::LiveClock;
use crate::config_gate::ConfigGate;
use crate::constants::{COMPLETION_CHANNEL_CAPACITY, SIGNAL_CHANNEL_CAPACITY};
use crate::error::ClientError;
use crate::http::{MessageResponse, RaceApi, StartResponse};
use crate::results::{fetch_report, LeaderboardRow, ResultReport, ResultReporter, ResultView};
use crate::settings::ClientSettings;
use crate::stream::{EventChannel, StreamClient, StreamSignal, StreamUpdate};
use crate::ui::{UiUpdate, UserCommand};
use crate::utils::clock_skew_ms;

pub const STATUS_WAITING_SENSOR: &str = "Race started (waiting sensor...)";
pub const STATUS_SENSOR_START: &str = "Race started (sensor)";
pub const STATUS_COMPLETED: &str = "Race completed";
pub const STATUS_RESET: &str = "Reset done";

/// Results of work spawned off the loop, tagged with the epoch they belong to.
#[derive(Debug)]
pub enum Completion {
    Start {
        epoch: u64,
        result: Result<StartResponse, ClientError>,
    },
    Reset {
        epoch: u64,
        result: Result<MessageResponse, ClientError>,
    },
    Results {
        epoch: u64,
        report: ResultReport,
    },
    Config(Result<ServerConfig, ClientError>),
    Leaderboard(Result<Vec<LeaderboardEntry>, ClientError>),
}

pub struct AppInbox {
    pub signal_rx: mpsc::Receiver<StreamSignal>,
    pub completion_rx: mpsc::Receiver<Completion>,
}

pub struct AppContext<C> {
    api: RaceApi,
    gate: ConfigGate,
    session: RaceSession,
    clock: LiveClock,
    stream: StreamClient<C>,
    results: ResultReporter,
    ui_tx: mpsc::Sender<UiUpdate>,
    completion_tx: mpsc::Sender<Completion>,
}

impl<C: EventChannel> AppContext<C> {
    pub fn new(
        settings: &ClientSettings,
        api: RaceApi,
        channel: Arc<C>,
        ui_tx: mpsc::Sender<UiUpdate>,
    ) -> (Self, AppInbox) {
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_CHANNEL_CAPACITY);
        let ctx = Self {
            api,
            gate: ConfigGate::new(),
            session: RaceSession::new(),
            clock: LiveClock::new(settings.clock_tick),
            stream: StreamClient::new(channel, settings.reconnect, signal_tx),
            results: ResultReporter::new(settings.result_delay),
            ui_tx,
            completion_tx,
        };
        let inbox = AppInbox {
            signal_rx,
            completion_rx,
        };
        (ctx, inbox)
    }

    pub fn state(&self) -> RaceState {
        self.session.state()
    }

    pub fn session(&self) -> &RaceSession {
        &self.session
    }

    pub fn gate(&self) -> &ConfigGate {
        &self.gate
    }

    /// Loads the config first so validation is ready, then fetches the leaderboard and connects.
    pub async fn boot(&mut self) {
        let fetched = self.api.fetch_config().await;
        self.apply_config(fetched).await;
        self.spawn_leaderboard();
        self.stream.connect();
        self.emit_connection().await;
    }

    async fn emit(&self, update: UiUpdate) {
        let _ = self.ui_tx.send(update).await;
    }

    async fn emit_status(&self, message: &str) {
        self.emit(UiUpdate::Status {
            message: message.to_string(),
        })
        .await;
    }

    async fn emit_error(&self, err: &ClientError) {
        self.emit(UiUpdate::Error {
            messages: err.messages(),
        })
        .await;
    }

    async fn emit_connection(&self) {
        self.emit(UiUpdate::Connection {
            status: self.stream.status(),
            reconnect_attempts: self.stream.reconnect_attempts(),
        })
        .await;
    }

    fn spawn_completion<F>(&self, work: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(work.await).await;
        });
    }

    fn spawn_leaderboard(&self) {
        let api = self.api.clone();
        self.spawn_completion(async move { Completion::Leaderboard(api.fetch_leaderboard().await) });
    }

    async fn apply_config(&mut self, fetched: Result<ServerConfig, ClientError>) {
        if !self.gate.apply(fetched) {
            return;
        }
        if let Some(config) = self.gate.config() {
            let update = UiUpdate::Config {
                min_laps: config.min_laps,
                max_laps: config.max_laps,
                default_laps: config.default_laps,
            };
            self.emit(update).await;
        }
    }

    /// Returns false when the loop should stop.
    pub async fn handle_command(&mut self, command: UserCommand) -> bool {
        match command {
            UserCommand::Start { name, laps } => self.start_race(&name, &laps).await,
            UserCommand::Reset => self.reset_race().await,
            UserCommand::Reconnect => {
                info!("manual reconnect");
                self.stream.reconnect_now();
                self.emit_connection().await;
            }
            UserCommand::FocusRegained => {
                if self.stream.focus_regained() {
                    self.emit_connection().await;
                }
            }
            UserCommand::ReloadConfig => {
                let api = self.api.clone();
                self.spawn_completion(async move { Completion::Config(api.fetch_config().await) });
            }
            UserCommand::Quit => return false,
        }
        true
    }

    async fn start_race(&mut self, name: &str, laps: &str) {
        let state = self.session.state();
        if !state.accepts_start() {
            warn!(state = %state, "start rejected");
            self.emit_error(&LifecycleError::StartRejected(state).into()).await;
            return;
        }
        let laps = match (laps.trim().is_empty(), self.gate.default_laps()) {
            (true, Some(default_laps)) => default_laps.to_string(),
            _ => laps.to_string(),
        };
        let entry = match self.gate.validate(name, &laps) {
            Ok(entry) => entry,
            Err(err) => {
                self.emit_error(&err).await;
                return;
            }
        };

        self.results.cancel();
        let events = self.session.request_start();
        self.apply_session_events(events).await;
        self.emit(UiUpdate::ResultHidden).await;
        info!(name = %entry.name, laps = entry.laps, "race start requested");

        let epoch = self.session.epoch();
        let api = self.api.clone();
        self.spawn_completion(async move {
            let result = api.start_race(&entry).await;
            Completion::Start { epoch, result }
        });
    }

    async fn reset_race(&mut self) {
        self.results.cancel();
        let events = self.session.reset();
        self.apply_session_events(events).await;
        self.emit(UiUpdate::ResultHidden).await;

        let epoch = self.session.epoch();
        let api = self.api.clone();
        self.spawn_completion(async move {
            Completion::Reset {
                epoch,
                result: api.reset_race().await,
            }
        });
    }

    /// Applies the side effects of one session input, in a fixed order.
    pub async fn apply_session_events(&mut self, events: SessionEvents) {
        if let Some(reason) = events.ignored {
            match reason {
                Ignored::Lifecycle(LifecycleError::Stale { .. }) => {
                    debug!(reason = %reason, "stale completion dropped")
                }
                _ => warn!(state = %self.session.state(), reason = %reason, "input ignored"),
            }
        }
        if events.ledger_cleared {
            self.emit(UiUpdate::LapsCleared).await;
        }
        match events.clock {
            ClockCommand::Keep => {}
            ClockCommand::Start { remote_start_ts_ms } => {
                self.clock.start(remote_start_ts_ms);
                self.emit(UiUpdate::Timer {
                    elapsed: ZERO_ELAPSED.to_string(),
                })
                .await;
            }
            ClockCommand::Stop => {
                let elapsed_ms = self.clock.stop();
                self.emit(UiUpdate::TimerLocked {
                    elapsed: format_elapsed(elapsed_ms),
                })
                .await;
            }
            ClockCommand::Reset => {
                self.clock.reset();
                self.emit(UiUpdate::Timer {
                    elapsed: ZERO_ELAPSED.to_string(),
                })
                .await;
            }
        }
        if let Some(lap) = events.lap {
            debug!(sequence = lap.sequence, segment_ms = lap.segment_ms, cumulative_ms = lap.cumulative_ms, "lap recorded");
            self.emit(UiUpdate::LapAppended {
                sequence: lap.sequence,
                segment: format_elapsed(lap.segment_ms),
                cumulative: format_elapsed(lap.cumulative_ms),
                segment_ms: lap.segment_ms,
                cumulative_ms: lap.cumulative_ms,
            })
            .await;
        }
        if let Some(transition) = events.transition {
            info!(from = ?transition.from, to = ?transition.to, epoch = transition.epoch, "race state");
            self.emit(UiUpdate::Lifecycle {
                from: transition.from,
                to: transition.to,
                start_enabled: transition.to.accepts_start(),
            })
            .await;
        }
        if events.schedule_results {
            self.results.schedule(self.session.epoch());
        }
    }

    pub async fn dispatch_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::RaceStarted { ts_ms } => {
                let events = self.session.race_started(ts_ms);
                let started = events.transition.is_some();
                self.apply_session_events(events).await;
                if started {
                    info!(server_ts_ms = ts_ms, skew_ms = ?clock_skew_ms(ts_ms), "race started");
                    self.results.cancel();
                    self.emit_status(STATUS_SENSOR_START).await;
                }
            }
            StreamEvent::Lap { id, segment_ms } => {
                let events = self.session.lap(id, segment_ms);
                self.apply_session_events(events).await;
            }
            StreamEvent::RaceEnded { ts_ms } => {
                let events = self.session.race_ended();
                let ended = events.transition.is_some();
                self.apply_session_events(events).await;
                if ended {
                    info!(server_ts_ms = ?ts_ms, laps = self.session.ledger().len(), "race ended");
                    self.emit_status(STATUS_COMPLETED).await;
                }
            }
            StreamEvent::KeepAlive => {}
        }
    }

    pub async fn handle_signal(&mut self, signal: StreamSignal) {
        match self.stream.handle_signal(signal) {
            Some(StreamUpdate::Opened) => self.emit_connection().await,
            Some(StreamUpdate::Event(event)) => self.dispatch_event(event).await,
            Some(StreamUpdate::RetryScheduled { attempt, delay_ms }) => {
                self.emit_connection().await;
                self.emit_status(&format!(
                    "Connection lost, retrying in {}s (attempt {})",
                    delay_ms / 1_000,
                    attempt
                ))
                .await;
            }
            Some(StreamUpdate::Exhausted { attempts }) => {
                self.emit_connection().await;
                self.emit_error(&ClientError::ExhaustedRetries { attempts }).await;
            }
            None => {}
        }
    }

    pub async fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Start { epoch, result } => match result {
                Ok(response) => {
                    if self.session.is_current(epoch) && self.session.state() == RaceState::Starting {
                        info!(driver = ?response.driver, laps = ?response.laps, "start accepted");
                        self.emit_status(STATUS_WAITING_SENSOR).await;
                    } else {
                        debug!(epoch, "start acknowledged after state moved on");
                    }
                }
                Err(err) => {
                    warn!(error = %err, "start request failed");
                    if self.session.is_current(epoch) {
                        self.emit_error(&err).await;
                    }
                    let events = self.session.start_failed(epoch);
                    self.apply_session_events(events).await;
                }
            },
            Completion::Reset { epoch, result } => match result {
                Ok(_) => {
                    if self.session.is_current(epoch) {
                        self.emit_status(STATUS_RESET).await;
                    } else {
                        debug!(epoch, "reset acknowledged after state moved on");
                    }
                    self.spawn_leaderboard();
                }
                Err(err) => {
                    warn!(error = %err, "reset request failed");
                    self.emit_error(&err).await;
                }
            },
            Completion::Results { epoch, report } => self.apply_report(epoch, report).await,
            Completion::Config(fetched) => self.apply_config(fetched).await,
            Completion::Leaderboard(fetched) => match fetched {
                Ok(entries) => self.emit_leaderboard(&entries).await,
                Err(err) => warn!(error = %err, "leaderboard unavailable"),
            },
        }
    }

    async fn emit_leaderboard(&self, entries: &[LeaderboardEntry]) {
        let entries = entries.iter().map(LeaderboardRow::from).collect();
        self.emit(UiUpdate::Leaderboard { entries }).await;
    }

    async fn apply_report(&mut self, epoch: u64, report: ResultReport) {
        if !self.session.is_current(epoch) {
            debug!(epoch, current = self.session.epoch(), "discarding stale race result");
            return;
        }
        match &report.result {
            Ok(result) => self.emit(UiUpdate::Result(ResultView::from(result))).await,
            Err(err) => {
                warn!(error = %err, "race result unavailable");
                self.emit_error(err).await;
            }
        }
        match &report.leaderboard {
            Ok(entries) => self.emit_leaderboard(entries).await,
            Err(err) => warn!(error = %err, "leaderboard unavailable"),
        }
        let events = self.session.results_settled(epoch);
        self.apply_session_events(events).await;
    }

    fn fetch_results(&self, epoch: u64) {
        if !self.session.is_current(epoch) {
            return;
        }
        let api = self.api.clone();
        self.spawn_completion(async move {
            let report = fetch_report(&api).await;
            Completion::Results { epoch, report }
        });
    }
}

/// Runs the client until `Quit` or the command channel closes.
pub async fn run<C: EventChannel>(
    mut ctx: AppContext<C>,
    mut inbox: AppInbox,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
) {
    ctx.boot().await;
    info!(server = %ctx.api.base_url(), "race client running");

    loop {
        tokio::select! {
            elapsed_ms = ctx.clock.tick() => {
                ctx.emit(UiUpdate::Timer { elapsed: format_elapsed(elapsed_ms) }).await;
            }
            Some(signal) = inbox.signal_rx.recv() => ctx.handle_signal(signal).await,
            Some(completion) = inbox.completion_rx.recv() => ctx.handle_completion(completion).await,
            command = cmd_rx.recv() => match command {
                Some(command) => {
                    if !ctx.handle_command(command).await {
                        break;
                    }
                }
                None => break,
            },
            _ = ctx.stream.reconnect_due() => {
                ctx.stream.connect();
                ctx.emit_connection().await;
            }
            Some(epoch) = ctx.results.settled() => ctx.fetch_results(epoch),
        }
    }

    ctx.stream.shutdown();
    ctx.clock.reset();
    info!("race client stopped");
}
