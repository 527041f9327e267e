// HTTP client for the race server's JSON endpoints and event stream.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use timing_core::model::{LeaderboardEntry, RaceResult, ServerConfig};
use timing_core::validation::RaceEntry;

use crate::constants::{PATH_CONFIG, PATH_EVENTS, PATH_LEADERBOARD, PATH_RESET, PATH_RESULT, PATH_START};
use crate::error::ClientError;
use crate::settings::ClientSettings;

mod types;
pub use types::*;

#[derive(Clone, Debug)]
pub struct RaceApi {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl RaceApi {
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        // No client-wide timeout: it would also cut the long-lived event stream.
        let client = Client::builder()
            .connect_timeout(settings.http_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: settings.server_url.trim_end_matches('/').to_string(),
            timeout: settings.http_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = check_status(request.timeout(self.timeout).send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn start_race(&self, entry: &RaceEntry) -> Result<StartResponse, ClientError> {
        debug!(name = %entry.name, laps = entry.laps, "POST start");
        let body = StartRequest {
            name: &entry.name,
            laps: entry.laps,
        };
        self.send_json(self.client.post(self.url(PATH_START)).json(&body))
            .await
    }

    pub async fn reset_race(&self) -> Result<MessageResponse, ClientError> {
        debug!("POST reset");
        self.send_json(self.client.post(self.url(PATH_RESET))).await
    }

    pub async fn fetch_config(&self) -> Result<ServerConfig, ClientError> {
        self.send_json(self.client.get(self.url(PATH_CONFIG))).await
    }

    pub async fn fetch_leaderboard(&self) -> Result<Vec<LeaderboardEntry>, ClientError> {
        self.send_json(self.client.get(self.url(PATH_LEADERBOARD)))
            .await
    }

    pub async fn fetch_result(&self) -> Result<RaceResult, ClientError> {
        self.send_json(self.client.get(self.url(PATH_RESULT))).await
    }

    /// Opens the push channel. The body is consumed by the stream task.
    pub async fn open_events(&self) -> Result<Response, ClientError> {
        let response = self
            .client
            .get(self.url(PATH_EVENTS))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|err| err.error)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("error").to_string()
            } else {
                body
            }
        });
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}
