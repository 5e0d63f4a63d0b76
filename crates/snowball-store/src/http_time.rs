//! HTTP implementation of the external time source.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use snowball_core::error::DomainError;
use snowball_core::time::TimeSource;
use tracing::{debug, instrument};

/// Default world-time endpoint.
pub const DEFAULT_TIME_URL: &str = "https://worldtimeapi.org/api/ip";

#[derive(Debug, Deserialize)]
struct WorldTime {
    utc_datetime: DateTime<Utc>,
}

/// Fetches the current time from a world-time JSON endpoint.
#[derive(Debug, Clone)]
pub struct HttpTimeSource {
    client: reqwest::Client,
    url: String,
}

impl HttpTimeSource {
    /// Creates a time source querying `url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the HTTP client cannot be
    /// built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Infrastructure(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

fn parse_world_time(body: &str) -> Result<DateTime<Utc>, DomainError> {
    serde_json::from_str::<WorldTime>(body)
        .map(|time| time.utc_datetime)
        .map_err(|e| DomainError::Infrastructure(format!("unexpected time payload: {e}")))
}

#[async_trait]
impl TimeSource for HttpTimeSource {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn fetch_now(&self) -> Result<DateTime<Utc>, DomainError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                if e.is_timeout() {
                    DomainError::Timeout(format!("time source: {e}"))
                } else {
                    DomainError::Infrastructure(format!("time source: {e}"))
                }
            })?;
        let body = response
            .text()
            .await
            .map_err(|e| DomainError::Infrastructure(format!("time source body: {e}")))?;
        let now = parse_world_time(&body)?;
        debug!(%now, "fetched external time");
        Ok(now)
    }
}
