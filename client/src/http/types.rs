// HTTP request and response payload types.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize)]
pub struct StartRequest<'a> {
    pub name: &'a str,
    pub laps: u32,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StartResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub laps: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
