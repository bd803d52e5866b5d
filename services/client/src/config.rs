//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::time::Duration;
use tracing::Level;
use url::Url;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Root of the REST backend. Always ends with `/` so paths join under it.
    pub api_base_url: Url,
    pub log_level: Level,
    /// Bearer credential issued by the identity provider, if already signed in.
    pub auth_token: Option<String>,
    pub request_timeout: Duration,
    /// How long a successful read is served without a background refetch.
    pub query_stale_time: Duration,
    /// Automatic retries for a failed read. Writes are never retried.
    pub query_retry: u32,
    /// Size of the public-lessons window the contributor leaderboard is computed over.
    pub leaderboard_fetch_limit: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Backend Location ---
        let base = lookup("API_BASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("API_BASE_URL".to_string()))?;
        let api_base_url = parse_base_url(&base)?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let auth_token = lookup("AUTH_TOKEN").filter(|t| !t.trim().is_empty());

        // --- Fetching Policy ---
        let request_timeout =
            Duration::from_secs(parse_number(&lookup, "REQUEST_TIMEOUT_SECS", 15)?);
        let query_stale_time = Duration::from_secs(parse_number(&lookup, "QUERY_STALE_SECS", 0)?);
        let query_retry = parse_number(&lookup, "QUERY_RETRY", 1)? as u32;
        let leaderboard_fetch_limit = parse_number(&lookup, "LEADERBOARD_FETCH_LIMIT", 100)? as u32;

        Ok(Self {
            api_base_url,
            log_level,
            auth_token,
            request_timeout,
            query_stale_time,
            query_retry,
            leaderboard_fetch_limit,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidValue("API_BASE_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue(
            "API_BASE_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_number<F>(lookup: &F, name: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
    }
}
