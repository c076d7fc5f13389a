//! Client configuration.
//!
//! `ClientSettings` is the plain named-field input; `ClientConfig` is the
//! validated, immutable value the client reads for its whole lifetime.

use std::env;
use std::time::Duration;

use crate::error::ValidationError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8123";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Unvalidated configuration input.
///
/// ```
/// use banking_core::{ClientConfig, ClientSettings};
///
/// let config = ClientConfig::try_from(ClientSettings {
///     base_url: "http://bank.internal/".to_string(),
///     max_retries: 0,
///     ..ClientSettings::default()
/// })
/// .unwrap();
/// assert_eq!(config.base_url(), "http://bank.internal");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

/// Validated client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl TryFrom<ClientSettings> for ClientConfig {
    type Error = ValidationError;

    fn try_from(settings: ClientSettings) -> Result<Self, Self::Error> {
        let base_url = settings.base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ValidationError::EmptyField { field: "base_url" });
        }
        if settings.timeout_secs == 0 {
            return Err(ValidationError::NonPositiveTimeout);
        }
        if settings.retry_delay_ms == 0 {
            return Err(ValidationError::NonPositiveRetryDelay);
        }
        Ok(Self {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(settings.timeout_secs),
            max_retries: settings.max_retries,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from `BANKING_*` environment variables.
    ///
    /// Unset variables fall back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = ClientSettings::default();

        if let Some(url) = lookup("BANKING_BASE_URL") {
            settings.base_url = url;
        }
        if let Some(raw) = lookup("BANKING_TIMEOUT_SECS") {
            settings.timeout_secs = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BANKING_TIMEOUT_SECS"))?;
        }
        if let Some(raw) = lookup("BANKING_MAX_RETRIES") {
            settings.max_retries = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BANKING_MAX_RETRIES"))?;
        }
        if let Some(raw) = lookup("BANKING_RETRY_DELAY_MS") {
            settings.retry_delay_ms = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BANKING_RETRY_DELAY_MS"))?;
        }

        Ok(Self::try_from(settings)?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-attempt request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Total attempts per logical call.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep before the attempt following failed attempt `attempt` (1-based).
    /// Grows linearly: `retry_delay * attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
