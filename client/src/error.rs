// Client error kinds surfaced to the event loop and the UI.

use thiserror::Error;
use timing_core::lifecycle::LifecycleError;
use timing_core::sse::ProtocolError;
use timing_core::validation::ValidationIssue;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded {status}: {message}")]
    Server { status: u16, message: String },
    #[error("event channel: {0}")]
    Channel(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("invalid race entry")]
    Validation(Vec<ValidationIssue>),
    #[error("connection lost after {attempts} reconnect attempts; reconnect manually")]
    ExhaustedRetries { attempts: u32 },
}

impl ClientError {
    /// User-facing lines; validation expands to one line per rule.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ClientError::Validation(issues) => issues.iter().map(ToString::to_string).collect(),
            other => vec![other.to_string()],
        }
    }
}
