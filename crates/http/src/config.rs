//! Client configuration

use crate::client::error::ClientError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default backend address when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Connection and session settings for [`crate::JobdmClient`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL
    pub api_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// How long a successful auth check is reused, in seconds
    pub auth_check_ttl_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
            auth_check_ttl_secs: 300,
            user_agent: concat!("jobdm-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a file, overridden by `JOBDM_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClientError> {
        let settings = Self::defaults_builder()?
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("JOBDM"))
            .build()
            .map_err(config_error)?;

        Self::finish(settings)
    }

    /// Load configuration with defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed
    pub fn from_env() -> Result<Self, ClientError> {
        let settings = Self::defaults_builder()?
            .add_source(config::Environment::with_prefix("JOBDM"))
            .build()
            .map_err(config_error)?;

        Self::finish(settings)
    }

    /// Request timeout as a [`Duration`]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Auth check cache lifetime as a [`Duration`]
    pub const fn auth_check_ttl(&self) -> Duration {
        Duration::from_secs(self.auth_check_ttl_secs)
    }

    /// Check the values and normalize the base URL
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] for a relative or unparsable URL
    /// or a zero timeout
    pub fn validate(mut self) -> Result<Self, ClientError> {
        self.api_url = normalize_base_url(&self.api_url)?;
        if self.timeout_secs == 0 {
            return Err(ClientError::Configuration(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(self)
    }

    fn defaults_builder()
    -> Result<config::ConfigBuilder<config::builder::DefaultState>, ClientError> {
        let defaults = Self::default();

        config::Config::builder()
            .set_default("api_url", defaults.api_url)
            .and_then(|b| b.set_default("timeout_secs", defaults.timeout_secs))
            .and_then(|b| b.set_default("auth_check_ttl_secs", defaults.auth_check_ttl_secs))
            .and_then(|b| b.set_default("user_agent", defaults.user_agent))
            .map_err(config_error)
    }

    fn finish(settings: config::Config) -> Result<Self, ClientError> {
        let config: Self = settings.try_deserialize().map_err(config_error)?;
        config.validate()
    }
}

/// Parse an absolute base URL and strip any trailing slash
pub(crate) fn normalize_base_url(raw: &str) -> Result<String, ClientError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| ClientError::Configuration(format!("invalid api_url {raw:?}: {e}")))?;
    if parsed.cannot_be_a_base() {
        return Err(ClientError::Configuration(format!(
            "api_url {raw:?} cannot be used as a base URL"
        )));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn config_error(err: config::ConfigError) -> ClientError {
    ClientError::Configuration(err.to_string())
}
