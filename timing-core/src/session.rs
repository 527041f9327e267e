// Race session: lifecycle plus lap ledger, reporting the effects each input requires.
// Invariants: every input either fully applies or leaves lifecycle and ledger untouched.

use std::collections::HashSet;

use thiserror::Error;

use crate::ledger::{LapLedger, LapRecord, LapRejected};
use crate::lifecycle::{LifecycleError, RaceLifecycle, RaceState, StateTransition};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClockCommand {
    #[default]
    Keep,
    Start {
        remote_start_ts_ms: u64,
    },
    /// Stop and keep the last value on display.
    Stop,
    /// Stop and show zero.
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Ignored {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Lap(#[from] LapRejected),
    #[error("lap received while {0}")]
    LapOutsideRace(RaceState),
    #[error("lap {0} already recorded")]
    DuplicateLap(u64),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionEvents {
    pub transition: Option<StateTransition>,
    pub ledger_cleared: bool,
    pub clock: ClockCommand,
    pub lap: Option<LapRecord>,
    pub schedule_results: bool,
    pub ignored: Option<Ignored>,
}

impl SessionEvents {
    fn ignored(reason: impl Into<Ignored>) -> Self {
        Self {
            ignored: Some(reason.into()),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RaceSession {
    lifecycle: RaceLifecycle,
    ledger: LapLedger,
    seen_lap_ids: HashSet<u64>,
    remote_start_ts_ms: Option<u64>,
}

impl RaceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RaceState {
        self.lifecycle.state()
    }

    pub fn epoch(&self) -> u64 {
        self.lifecycle.epoch()
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.lifecycle.is_current(epoch)
    }

    pub fn ledger(&self) -> &LapLedger {
        &self.ledger
    }

    pub fn remote_start_ts_ms(&self) -> Option<u64> {
        self.remote_start_ts_ms
    }

    fn clear_race(&mut self) {
        self.ledger.reset();
        self.seen_lap_ids.clear();
        self.remote_start_ts_ms = None;
    }

    pub fn request_start(&mut self) -> SessionEvents {
        match self.lifecycle.request_start() {
            Ok(transition) => {
                self.clear_race();
                SessionEvents {
                    transition: Some(transition),
                    ledger_cleared: true,
                    clock: ClockCommand::Reset,
                    ..SessionEvents::default()
                }
            }
            Err(err) => SessionEvents::ignored(err),
        }
    }

    pub fn start_failed(&mut self, issued: u64) -> SessionEvents {
        match self.lifecycle.start_failed(issued) {
            Ok(transition) => SessionEvents {
                transition: Some(transition),
                ..SessionEvents::default()
            },
            Err(err) => SessionEvents::ignored(err),
        }
    }

    /// A duplicate while Running is ignored outright: laps and clock anchor are kept.
    pub fn race_started(&mut self, remote_start_ts_ms: u64) -> SessionEvents {
        match self.lifecycle.race_started() {
            Ok(transition) => {
                self.clear_race();
                self.remote_start_ts_ms = Some(remote_start_ts_ms);
                SessionEvents {
                    transition: Some(transition),
                    ledger_cleared: true,
                    clock: ClockCommand::Start { remote_start_ts_ms },
                    ..SessionEvents::default()
                }
            }
            Err(err) => SessionEvents::ignored(err),
        }
    }

    pub fn lap(&mut self, lap_id: Option<u64>, segment_ms: i64) -> SessionEvents {
        let state = self.lifecycle.state();
        if !state.accepts_laps() {
            return SessionEvents::ignored(Ignored::LapOutsideRace(state));
        }
        if let Some(id) = lap_id {
            if self.seen_lap_ids.contains(&id) {
                return SessionEvents::ignored(Ignored::DuplicateLap(id));
            }
        }
        match self.ledger.record_lap(segment_ms) {
            Ok(record) => {
                if let Some(id) = lap_id {
                    self.seen_lap_ids.insert(id);
                }
                SessionEvents {
                    lap: Some(record),
                    ..SessionEvents::default()
                }
            }
            Err(err) => SessionEvents::ignored(err),
        }
    }

    pub fn race_ended(&mut self) -> SessionEvents {
        match self.lifecycle.race_ended() {
            Ok(transition) => SessionEvents {
                transition: Some(transition),
                clock: ClockCommand::Stop,
                schedule_results: true,
                ..SessionEvents::default()
            },
            Err(err) => SessionEvents::ignored(err),
        }
    }

    pub fn results_settled(&mut self, issued: u64) -> SessionEvents {
        match self.lifecycle.results_settled(issued) {
            Ok(transition) => SessionEvents {
                transition: Some(transition),
                ..SessionEvents::default()
            },
            Err(err) => SessionEvents::ignored(err),
        }
    }

    pub fn reset(&mut self) -> SessionEvents {
        let transition = self.lifecycle.reset();
        self.clear_race();
        SessionEvents {
            transition: Some(transition),
            ledger_cleared: true,
            clock: ClockCommand::Reset,
            ..SessionEvents::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_session() -> RaceSession {
        let mut session = RaceSession::new();
        session.request_start();
        session.race_started(1_000);
        session
    }

    #[test]
    fn scenario_cumulative_column() {
        let mut session = RaceSession::new();
        let events = session.request_start();
        assert!(events.ledger_cleared);
        assert_eq!(session.state(), RaceState::Starting);

        let events = session.race_started(1_000);
        assert_eq!(
            events.clock,
            ClockCommand::Start {
                remote_start_ts_ms: 1_000
            }
        );
        assert_eq!(session.state(), RaceState::Running);

        let cumulative: Vec<u64> = [(1, 5_000), (2, 4_800), (3, 5_200)]
            .iter()
            .map(|(id, ms)| session.lap(Some(*id), *ms).lap.unwrap().cumulative_ms)
            .collect();
        assert_eq!(cumulative, vec![5_000, 9_800, 15_000]);

        let events = session.race_ended();
        assert_eq!(events.clock, ClockCommand::Stop);
        assert!(events.schedule_results);
        assert_eq!(session.state(), RaceState::Finished);
        assert_eq!(session.ledger().len(), 3);
    }

    #[test]
    fn lap_while_idle_is_discarded() {
        let mut session = RaceSession::new();
        let events = session.lap(Some(7), 5_000);
        assert_eq!(events.lap, None);
        assert_eq!(events.ignored, Some(Ignored::LapOutsideRace(RaceState::Idle)));
        assert!(session.ledger().is_empty());
    }

    #[test]
    fn duplicate_race_started_keeps_laps() {
        let mut session = running_session();
        session.lap(Some(1), 5_000);
        session.lap(Some(2), 4_000);

        let events = session.race_started(2_000);
        assert_eq!(events.transition, None);
        assert_eq!(events.clock, ClockCommand::Keep);
        assert!(!events.ledger_cleared);
        assert_eq!(
            events.ignored,
            Some(Ignored::Lifecycle(LifecycleError::DuplicateStart))
        );
        assert_eq!(session.ledger().len(), 2);
        assert_eq!(session.remote_start_ts_ms(), Some(1_000));
    }

    #[test]
    fn redelivered_lap_is_discarded() {
        let mut session = running_session();
        assert!(session.lap(Some(42), 5_000).lap.is_some());
        let events = session.lap(Some(42), 5_000);
        assert_eq!(events.ignored, Some(Ignored::DuplicateLap(42)));
        assert_eq!(session.ledger().cumulative_ms(), 5_000);

        // laps without an id cannot be deduplicated
        assert!(session.lap(None, 1_000).lap.is_some());
        assert!(session.lap(None, 1_000).lap.is_some());
        assert_eq!(session.ledger().len(), 3);
    }

    #[test]
    fn negative_lap_does_not_mark_id_seen() {
        let mut session = running_session();
        let events = session.lap(Some(5), -10);
        assert!(matches!(events.ignored, Some(Ignored::Lap(LapRejected::NegativeSegment(-10)))));
        assert!(session.lap(Some(5), 10).lap.is_some());
    }

    #[test]
    fn start_rejected_while_running() {
        let mut session = running_session();
        session.lap(Some(1), 5_000);
        let events = session.request_start();
        assert_eq!(events.transition, None);
        assert!(!events.ledger_cleared);
        assert_eq!(session.state(), RaceState::Running);
        assert_eq!(session.ledger().len(), 1);
    }

    #[test]
    fn reset_from_running_empties_ledger() {
        let mut session = running_session();
        session.lap(Some(1), 5_000);
        let events = session.reset();
        assert_eq!(events.clock, ClockCommand::Reset);
        assert_eq!(session.state(), RaceState::Idle);
        assert!(session.ledger().is_empty());

        // ids from the previous race no longer block new laps
        session.race_started(3_000);
        assert!(session.lap(Some(1), 5_000).lap.is_some());
    }

    #[test]
    fn settlement_after_reset_is_stale() {
        let mut session = running_session();
        let ended = session.race_ended().transition.unwrap();
        session.reset();
        let events = session.results_settled(ended.epoch);
        assert!(matches!(
            events.ignored,
            Some(Ignored::Lifecycle(LifecycleError::Stale { .. }))
        ));
        assert_eq!(session.state(), RaceState::Idle);
    }
}
