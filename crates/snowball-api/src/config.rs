//! Configuration read from the environment at startup.

use std::path::PathBuf;
use std::time::Duration;

use snowball_core::ids::RecordKey;
use snowball_navigation::application::gate::DEFAULT_GATE_POLL;
use snowball_progress::application::progress_store::DEFAULT_REMOTE_TIMEOUT;
use snowball_store::http_time::DEFAULT_TIME_URL;

use crate::error::AppError;

/// Settings shared by both binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryConfig {
    /// Record the subject's progress is kept under.
    pub record_key: RecordKey,
    /// Manifest to load instead of the built-in story.
    pub story_path: Option<PathBuf>,
}

/// Settings for the admin API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub story: StoryConfig,
    /// OTLP collector; trace export is off when unset.
    pub otlp_endpoint: Option<String>,
}

/// Settings for the terminal player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Shared store; the player runs against an in-memory store when unset.
    pub database_url: Option<String>,
    pub story: StoryConfig,
    /// Local progress cache file.
    pub cache_path: PathBuf,
    /// World-time endpoint consulted for the gate.
    pub time_url: String,
    pub gate_poll: Duration,
    pub remote_timeout: Duration,
}

const DEFAULT_CACHE_PATH: &str = ".snowball-progress.json";

fn story_config(lookup: &impl Fn(&str) -> Option<String>) -> StoryConfig {
    StoryConfig {
        record_key: lookup("SNOWBALL_RECORD_KEY")
            .filter(|key| !key.trim().is_empty())
            .map_or_else(RecordKey::default, |key| RecordKey::new(key.trim())),
        story_path: lookup("SNOWBALL_STORY_PATH").map(PathBuf::from),
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| AppError::Config(format!("{name} is invalid: {e}")))
        })
        .transpose()
}

impl ApiConfig {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or `PORT`
    /// is not a valid port.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`ApiConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".into())
        })?;
        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "PORT")?.unwrap_or(3000),
            story: story_config(&lookup),
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|url| !url.is_empty()),
        })
    }
}

impl PlayerConfig {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a numeric setting does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`PlayerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let gate_poll = parse_var::<u64>(&lookup, "SNOWBALL_GATE_POLL_SECS")?
            .map_or(DEFAULT_GATE_POLL, Duration::from_secs);
        let remote_timeout = parse_var::<u64>(&lookup, "SNOWBALL_REMOTE_TIMEOUT_MS")?
            .map_or(DEFAULT_REMOTE_TIMEOUT, Duration::from_millis);
        if gate_poll.is_zero() {
            return Err(AppError::Config(
                "SNOWBALL_GATE_POLL_SECS must be positive".into(),
            ));
        }
        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            story: story_config(&lookup),
            cache_path: lookup("SNOWBALL_CACHE_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH), PathBuf::from),
            time_url: lookup("SNOWBALL_TIME_URL").unwrap_or_else(|| DEFAULT_TIME_URL.to_string()),
            gate_poll,
            remote_timeout,
        })
    }
}
