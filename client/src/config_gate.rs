// Server-declared race constraints and input validation against them.

use tracing::{info, warn};

use timing_core::model::ServerConfig;
use timing_core::validation::{validate_entry, RaceEntry};

use crate::error::ClientError;

#[derive(Clone, Debug, Default)]
pub struct ConfigGate {
    config: Option<ServerConfig>,
}

impl ConfigGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a fetched config. A failed fetch keeps whatever was loaded before.
    pub fn apply(&mut self, fetched: Result<ServerConfig, ClientError>) -> bool {
        match fetched {
            Ok(config) => {
                info!(
                    min_laps = config.min_laps,
                    max_laps = config.max_laps,
                    default_laps = config.default_laps,
                    sensor = config.sensor_port_label.as_deref().unwrap_or("-"),
                    "race config loaded"
                );
                self.config = Some(config);
                true
            }
            Err(err) => {
                warn!(error = %err, loaded = self.config.is_some(), "race config unavailable");
                false
            }
        }
    }

    pub fn config(&self) -> Option<&ServerConfig> {
        self.config.as_ref()
    }

    pub fn default_laps(&self) -> Option<u32> {
        self.config.as_ref().map(|config| config.default_laps)
    }

    pub fn validate(&self, name: &str, laps: &str) -> Result<RaceEntry, ClientError> {
        validate_entry(name, laps, self.config.as_ref()).map_err(ClientError::Validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timing_core::model::DEFAULT_NAME_MAX_LEN;

    fn config() -> ServerConfig {
        ServerConfig {
            min_laps: 1,
            max_laps: 20,
            default_laps: 5,
            name_max_len: DEFAULT_NAME_MAX_LEN,
            sensor_port_label: Some("COM5".to_string()),
        }
    }

    #[test]
    fn fallback_rules_until_loaded() {
        let mut gate = ConfigGate::new();
        assert!(!gate.apply(Err(ClientError::Channel("offline".to_string()))));
        assert!(gate.validate("Kim", "99").is_ok());
        assert_eq!(gate.default_laps(), None);

        assert!(gate.apply(Ok(config())));
        let err = gate.validate("Kim", "99").unwrap_err();
        assert_eq!(err.messages(), vec!["Lap count must be between 1 and 20".to_string()]);
        assert_eq!(gate.default_laps(), Some(5));
    }

    #[test]
    fn failed_refetch_keeps_previous_config() {
        let mut gate = ConfigGate::new();
        gate.apply(Ok(config()));
        gate.apply(Err(ClientError::Channel("offline".to_string())));
        assert_eq!(gate.config().map(|c| c.max_laps), Some(20));
    }

    #[test]
    fn name_failure_stops_before_lap_rules() {
        let mut gate = ConfigGate::new();
        gate.apply(Ok(config()));
        let err = gate.validate("", "x").unwrap_err();
        assert_eq!(err.messages(), vec!["Please enter a name".to_string()]);
        let err = gate.validate("Kim", "x").unwrap_err();
        assert_eq!(
            err.messages(),
            vec!["Lap count must be a positive integer".to_string()]
        );
    }
}
