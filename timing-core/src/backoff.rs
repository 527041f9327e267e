// Reconnect policy and connection bookkeeping for the push channel.
// Invariants: attempts reset on every open; nothing is scheduled once the ceiling is reached.

use serde::Serialize;

pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_STEP_MS: u64 = 2_000;
pub const RECONNECT_CEILING_MS: u64 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub step_ms: u64,
    pub ceiling_ms: u64,
}

impl ReconnectPolicy {
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        self.step_ms
            .saturating_mul(u64::from(attempt))
            .min(self.ceiling_ms)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RECONNECT_ATTEMPTS,
            step_ms: RECONNECT_STEP_MS,
            ceiling_ms: RECONNECT_CEILING_MS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closed,
    /// Retries used up; only an explicit reconnect leaves this state.
    Exhausted,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Open => "open",
            ConnectionStatus::Closed => "closed",
            ConnectionStatus::Exhausted => "exhausted",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectDecision {
    Retry { attempt: u32, delay_ms: u64 },
    GiveUp { attempts: u32 },
}

#[derive(Clone, Copy, Debug)]
pub struct ConnectionState {
    status: ConnectionStatus,
    reconnect_attempts: u32,
    policy: ReconnectPolicy,
}

impl ConnectionState {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            status: ConnectionStatus::Closed,
            reconnect_attempts: 0,
            policy,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn connecting(&mut self) {
        self.status = ConnectionStatus::Connecting;
    }

    pub fn opened(&mut self) {
        self.status = ConnectionStatus::Open;
        self.reconnect_attempts = 0;
    }

    pub fn failed(&mut self) -> ReconnectDecision {
        if self.reconnect_attempts < self.policy.max_attempts {
            self.reconnect_attempts += 1;
            self.status = ConnectionStatus::Closed;
            ReconnectDecision::Retry {
                attempt: self.reconnect_attempts,
                delay_ms: self.policy.delay_ms(self.reconnect_attempts),
            }
        } else {
            self.status = ConnectionStatus::Exhausted;
            ReconnectDecision::GiveUp {
                attempts: self.reconnect_attempts,
            }
        }
    }

    /// Explicit user reconnect starts a fresh retry budget.
    pub fn clear_attempts(&mut self) {
        self.reconnect_attempts = 0;
    }
}
