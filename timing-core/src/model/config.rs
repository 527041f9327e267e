// Server-declared race constraints.

use serde::{Deserialize, Serialize};

pub const DEFAULT_NAME_MAX_LEN: usize = 20;

fn default_name_max_len() -> usize {
    DEFAULT_NAME_MAX_LEN
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub min_laps: u32,
    pub max_laps: u32,
    pub default_laps: u32,
    #[serde(default = "default_name_max_len")]
    pub name_max_len: usize,
    #[serde(rename = "serial_port", default)]
    pub sensor_port_label: Option<String>,
}
