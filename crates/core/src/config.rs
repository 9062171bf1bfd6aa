//! Client configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional file,
//! then `PORTAL_`-prefixed environment variables (`PORTAL_API__BASE_URL`,
//! `PORTAL_SESSION__REFRESH_MARGIN_SECS`, ...).

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Token lifecycle settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Where session state is kept
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Wall-clock budget per request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// User agent sent with every request
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Token lifecycle settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Assumed lifetime of a freshly issued access token, in seconds
    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: u64,
    /// How long before the assumed expiry the proactive refresh fires
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: u64,
}

/// Session state location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Session file; the platform data directory is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_token_lifetime_secs() -> u64 {
    15 * 60
}

const fn default_refresh_margin_secs() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl ApiConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_lifetime_secs: default_token_lifetime_secs(),
            refresh_margin_secs: default_refresh_margin_secs(),
        }
    }
}

impl SessionConfig {
    /// Delay between issuing a token and refreshing it proactively
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(
            self.token_lifetime_secs
                .saturating_sub(self.refresh_margin_secs),
        )
    }
}

impl PortalConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Start with defaults
        builder = builder.add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        // Environment variables override file settings
        builder = builder.add_source(
            Environment::with_prefix("PORTAL")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the rest of the client relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.api.base_url)
            .map_err(|e| ConfigError::Message(format!("api.base_url: invalid URL - {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Message(format!(
                "api.base_url: unsupported scheme '{}'",
                url.scheme()
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "api.timeout_secs: must be greater than 0".to_string(),
            ));
        }

        if self.session.refresh_margin_secs >= self.session.token_lifetime_secs {
            return Err(ConfigError::Message(format!(
                "session.refresh_margin_secs: must be shorter than token_lifetime_secs ({})",
                self.session.token_lifetime_secs
            )));
        }

        Ok(())
    }
}
