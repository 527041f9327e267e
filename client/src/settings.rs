// Client settings resolved from the environment.

use std::env;
use std::time::Duration;

use timing_core::backoff::ReconnectPolicy;

use crate::constants::{
    CLOCK_TICK_MAX_MS, CLOCK_TICK_MIN_MS, CLOCK_TICK_MS, DEFAULT_SERVER_URL, HTTP_TIMEOUT_MS,
    RESULT_SETTLE_DELAY_MS,
};

#[derive(Clone, Debug)]
pub struct ClientSettings {
    pub server_url: String,
    pub clock_tick: Duration,
    pub result_delay: Duration,
    pub http_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    /// Emit UI updates as JSON lines instead of text.
    pub json_output: bool,
}

impl ClientSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |key: &str, default: u64| {
            lookup(key)
                .and_then(|value| value.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        let server_url = lookup("RACE_SERVER_URL")
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let tick_ms = millis("RACE_CLOCK_TICK_MS", CLOCK_TICK_MS).clamp(CLOCK_TICK_MIN_MS, CLOCK_TICK_MAX_MS);

        Self {
            server_url,
            clock_tick: Duration::from_millis(tick_ms),
            result_delay: Duration::from_millis(millis("RACE_RESULT_DELAY_MS", RESULT_SETTLE_DELAY_MS)),
            http_timeout: Duration::from_millis(millis("RACE_HTTP_TIMEOUT_MS", HTTP_TIMEOUT_MS)),
            reconnect: ReconnectPolicy::default(),
            json_output: lookup("RACE_UI_JSON")
                .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
