//! Client configuration.
//!
//! Loaded from environment variables; the binary reads a `.env` file first.

use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DEDUPE_WINDOW_MS: u64 = 2_000;

/// Connection settings for the listings backend.
///
/// `Debug` redacts the bearer token.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the backend API, e.g. `https://api.example.com/api/v1`
    pub base_url: Url,
    /// Bearer token attached to every request, if any
    pub api_token: Option<String>,
    pub timeout: Duration,
    /// How long a completed queue page is reused for an identical query
    pub dedupe_window: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("dedupe_window", &self.dedupe_window)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?;
        Ok(Self {
            base_url,
            api_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            dedupe_window: Duration::from_millis(DEFAULT_DEDUPE_WINDOW_MS),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_dedupe_window(mut self, window: Duration) -> Self {
        self.dedupe_window = window;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// - `ESTATE_API_URL` (required)
    /// - `ESTATE_API_TOKEN` (optional)
    /// - `ESTATE_TIMEOUT_SECS` (default: 30)
    /// - `ESTATE_DEDUPE_WINDOW_MS` (default: 2000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("ESTATE_API_URL").map_err(|_| ConfigError::MissingUrl)?;
        let mut config = Self::new(&raw)?;

        config.api_token = std::env::var("ESTATE_API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        config.timeout = Duration::from_secs(env_number("ESTATE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?);
        config.dedupe_window =
            Duration::from_millis(env_number("ESTATE_DEDUPE_WINDOW_MS", DEFAULT_DEDUPE_WINDOW_MS)?);

        Ok(config)
    }

    /// Join a path onto the base URL, keeping any base path prefix
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| ConfigError::InvalidUrl(path.to_string(), e.to_string()))
    }
}

fn env_number(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ESTATE_API_URL environment variable is required")]
    MissingUrl,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("{0} must be a whole number, got {1:?}")]
    InvalidNumber(String, String),
}
