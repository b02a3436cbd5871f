//! Application configuration loading and validation.
//!
//! Configuration is loaded from an optional TOML file. Credentials are
//! only taken from the environment (`GITHUB_TOKEN`, `GITHUB_USERNAME`),
//! never from the file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

mod github;
mod governor;
mod logging;

pub use github::{GithubConfig, HttpConfig, MAX_PER_PAGE, MAX_TRANSIENT_ATTEMPTS};
pub use governor::{GovernorConfig, SpacingTierConfig};
pub use logging::LoggingConfig;

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const USERNAME_ENV: &str = "GITHUB_USERNAME";

const fn default_true() -> bool {
    true
}

const fn default_verify_attempts() -> u32 {
    3
}

const fn default_verify_backoff_ms() -> u64 {
    5_000
}

/// Bulk executor behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Retry a candidate once after a rate-limit response.
    #[serde(default = "default_true")]
    pub retry_on_rate_limit: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            retry_on_rate_limit: true,
        }
    }
}

/// Post-batch verification behaviour.
///
/// The following listing is cached server-side and can lag behind
/// mutations, so verification re-reads it a few times.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyConfig {
    #[serde(default = "default_verify_attempts")]
    pub attempts: u32,
    #[serde(default = "default_verify_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            attempts: default_verify_attempts(),
            backoff_ms: default_verify_backoff_ms(),
        }
    }
}

impl VerifyConfig {
    #[must_use]
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub governor: GovernorConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub verify: VerifyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from a TOML file and overlay environment credentials.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let mut config = Self::parse(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    #[allow(clippy::result_large_err)]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate TOML content without touching the environment.
    #[allow(clippy::result_large_err)]
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay credentials from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.github.token = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty());
        if let Some(username) = lookup(USERNAME_ENV).filter(|u| !u.trim().is_empty()) {
            self.github.username = Some(username.trim().to_string());
        }
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.github.api_url.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "api_url" }.into());
        }
        if self.github.per_page == 0 || self.github.per_page > MAX_PER_PAGE {
            return Err(ConfigError::InvalidValue {
                field: "per_page",
                reason: format!("must be between 1 and {MAX_PER_PAGE}"),
            }
            .into());
        }
        if self.github.max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_pages",
                reason: "must be at least 1".into(),
            }
            .into());
        }
        let attempts = self.github.http.retry_max_attempts;
        if attempts == 0 || attempts > MAX_TRANSIENT_ATTEMPTS {
            return Err(ConfigError::InvalidValue {
                field: "retry_max_attempts",
                reason: format!("must be between 1 and {MAX_TRANSIENT_ATTEMPTS}"),
            }
            .into());
        }
        if self.governor.safety_floor >= self.governor.initial_budget {
            return Err(ConfigError::InvalidValue {
                field: "safety_floor",
                reason: "must be below initial_budget".into(),
            }
            .into());
        }
        Ok(())
    }

    /// The API token, or an error naming the variable to set.
    #[allow(clippy::result_large_err)]
    pub fn token(&self) -> Result<&str> {
        self.github
            .token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField { field: TOKEN_ENV }.into())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.per_page, 100);
        assert!(config.executor.retry_on_rate_limit);
        assert_eq!(config.verify.attempts, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn rejects_oversized_page() {
        let err = Config::parse("[github]\nper_page = 250\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { field: "per_page", .. })
        ));
    }

    #[test]
    fn rejects_zero_max_pages() {
        let err = Config::parse("[github]\nmax_pages = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_pages"));
    }

    #[test]
    fn transient_retry_is_capped_at_one() {
        let err = Config::parse("[github.http]\nretry_max_attempts = 5\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "retry_max_attempts",
                ..
            })
        ));
        assert!(Config::parse("[github.http]\nretry_max_attempts = 0\n").is_err());
        assert!(Config::parse("[github.http]\nretry_max_attempts = 1\n").is_ok());
    }

    #[test]
    fn token_is_never_read_from_file() {
        let config = Config::parse("[github]\ntoken = \"leaked\"\n").unwrap();
        assert!(config.github.token.is_none());
        assert!(config.token().is_err());
    }

    #[test]
    fn env_overlay_sets_credentials() {
        let mut config = Config::parse("[github]\nusername = \"from-file\"\n").unwrap();
        config.apply_env(|key| match key {
            TOKEN_ENV => Some("ghp_secret".into()),
            USERNAME_ENV => Some(" OctoCat ".into()),
            _ => None,
        });
        assert_eq!(config.token().unwrap(), "ghp_secret");
        assert_eq!(config.github.username.as_deref(), Some("OctoCat"));
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let mut config = Config::default();
        config.apply_env(|key| (key == TOKEN_ENV).then(|| "  ".to_string()));
        assert!(config.token().is_err());
    }
}
