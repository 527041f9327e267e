// Race lifecycle state machine.
// Invariants: start only from Idle; laps only while Running; every transition bumps the epoch.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceState {
    Idle,
    Starting,
    Running,
    Finished,
}

impl RaceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaceState::Idle => "idle",
            RaceState::Starting => "starting",
            RaceState::Running => "running",
            RaceState::Finished => "finished",
        }
    }

    pub fn accepts_start(&self) -> bool {
        matches!(self, RaceState::Idle)
    }

    pub fn accepts_laps(&self) -> bool {
        matches!(self, RaceState::Running)
    }
}

impl fmt::Display for RaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateTransition {
    pub from: RaceState,
    pub to: RaceState,
    pub epoch: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("start rejected while {0}")]
    StartRejected(RaceState),
    #[error("race already running")]
    DuplicateStart,
    #[error("race end ignored while {0}")]
    EndIgnored(RaceState),
    #[error("completion issued at epoch {issued} is stale (now {current})")]
    Stale { issued: u64, current: u64 },
}

#[derive(Clone, Debug)]
pub struct RaceLifecycle {
    state: RaceState,
    epoch: u64,
}

impl RaceLifecycle {
    pub fn new() -> Self {
        Self {
            state: RaceState::Idle,
            epoch: 0,
        }
    }

    pub fn state(&self) -> RaceState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    fn transition(&mut self, to: RaceState) -> StateTransition {
        let from = self.state;
        self.state = to;
        self.epoch = self.epoch.wrapping_add(1);
        StateTransition {
            from,
            to,
            epoch: self.epoch,
        }
    }

    fn ensure_current(&self, issued: u64) -> Result<(), LifecycleError> {
        if self.is_current(issued) {
            Ok(())
        } else {
            Err(LifecycleError::Stale {
                issued,
                current: self.epoch,
            })
        }
    }

    pub fn request_start(&mut self) -> Result<StateTransition, LifecycleError> {
        if !self.state.accepts_start() {
            return Err(LifecycleError::StartRejected(self.state));
        }
        Ok(self.transition(RaceState::Starting))
    }

    /// Rolls a pending start back to Idle when the start request never reached the server.
    pub fn start_failed(&mut self, issued: u64) -> Result<StateTransition, LifecycleError> {
        self.ensure_current(issued)?;
        if self.state != RaceState::Starting {
            return Err(LifecycleError::StartRejected(self.state));
        }
        Ok(self.transition(RaceState::Idle))
    }

    /// Server confirmation. Accepted from every state except Running.
    pub fn race_started(&mut self) -> Result<StateTransition, LifecycleError> {
        if self.state == RaceState::Running {
            return Err(LifecycleError::DuplicateStart);
        }
        Ok(self.transition(RaceState::Running))
    }

    pub fn race_ended(&mut self) -> Result<StateTransition, LifecycleError> {
        if self.state != RaceState::Running {
            return Err(LifecycleError::EndIgnored(self.state));
        }
        Ok(self.transition(RaceState::Finished))
    }

    pub fn results_settled(&mut self, issued: u64) -> Result<StateTransition, LifecycleError> {
        self.ensure_current(issued)?;
        if self.state != RaceState::Finished {
            return Err(LifecycleError::EndIgnored(self.state));
        }
        Ok(self.transition(RaceState::Idle))
    }

    /// Always permitted. Bumps the epoch even from Idle so in-flight completions go stale.
    pub fn reset(&mut self) -> StateTransition {
        self.transition(RaceState::Idle)
    }
}

impl Default for RaceLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let mut lifecycle = RaceLifecycle::new();
        let t = lifecycle.request_start().unwrap();
        assert_eq!((t.from, t.to), (RaceState::Idle, RaceState::Starting));
        let t = lifecycle.race_started().unwrap();
        assert_eq!(t.to, RaceState::Running);
        let t = lifecycle.race_ended().unwrap();
        assert_eq!(t.to, RaceState::Finished);
        let settled = lifecycle.results_settled(t.epoch).unwrap();
        assert_eq!(settled.to, RaceState::Idle);
        assert_eq!(lifecycle.epoch(), 4);
    }

    #[test]
    fn start_only_from_idle() {
        let mut lifecycle = RaceLifecycle::new();
        lifecycle.request_start().unwrap();
        lifecycle.race_started().unwrap();
        let epoch = lifecycle.epoch();
        assert_eq!(
            lifecycle.request_start(),
            Err(LifecycleError::StartRejected(RaceState::Running))
        );
        assert_eq!(lifecycle.state(), RaceState::Running);
        assert_eq!(lifecycle.epoch(), epoch);
    }

    #[test]
    fn duplicate_race_started_is_rejected() {
        let mut lifecycle = RaceLifecycle::new();
        lifecycle.race_started().unwrap();
        assert_eq!(lifecycle.race_started(), Err(LifecycleError::DuplicateStart));
        assert_eq!(lifecycle.state(), RaceState::Running);
    }

    #[test]
    fn reset_from_any_state() {
        let mut lifecycle = RaceLifecycle::new();
        lifecycle.request_start().unwrap();
        lifecycle.race_started().unwrap();
        let t = lifecycle.reset();
        assert_eq!((t.from, t.to), (RaceState::Running, RaceState::Idle));

        let before = lifecycle.epoch();
        let t = lifecycle.reset();
        assert_eq!((t.from, t.to), (RaceState::Idle, RaceState::Idle));
        assert_eq!(t.epoch, before + 1);
    }

    #[test]
    fn stale_settlement_is_rejected() {
        let mut lifecycle = RaceLifecycle::new();
        lifecycle.race_started().unwrap();
        let ended = lifecycle.race_ended().unwrap();
        lifecycle.reset();
        assert!(matches!(
            lifecycle.results_settled(ended.epoch),
            Err(LifecycleError::Stale { .. })
        ));
        assert_eq!(lifecycle.state(), RaceState::Idle);
    }

    #[test]
    fn failed_start_rolls_back() {
        let mut lifecycle = RaceLifecycle::new();
        let started = lifecycle.request_start().unwrap();
        let t = lifecycle.start_failed(started.epoch).unwrap();
        assert_eq!(t.to, RaceState::Idle);

        let started = lifecycle.request_start().unwrap();
        lifecycle.race_started().unwrap();
        assert!(lifecycle.start_failed(started.epoch).is_err());
        assert_eq!(lifecycle.state(), RaceState::Running);
    }

    #[test]
    fn race_end_outside_running_is_ignored() {
        let mut lifecycle = RaceLifecycle::new();
        assert_eq!(
            lifecycle.race_ended(),
            Err(LifecycleError::EndIgnored(RaceState::Idle))
        );
        lifecycle.request_start().unwrap();
        assert_eq!(
            lifecycle.race_ended(),
            Err(LifecycleError::EndIgnored(RaceState::Starting))
        );
    }
}
