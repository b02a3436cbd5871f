//! GitHub API connection settings.

use std::time::Duration;

use serde::Deserialize;

/// Largest page size the list endpoints accept.
pub const MAX_PER_PAGE: u32 = 100;

/// Transient failures are resent at most once.
pub const MAX_TRANSIENT_ATTEMPTS: u32 = 2;

fn default_api_url() -> String {
    "https://api.github.com".into()
}

const fn default_per_page() -> u32 {
    MAX_PER_PAGE
}

const fn default_max_pages() -> u32 {
    1_000
}

const fn default_timeout_ms() -> u64 {
    30_000
}

const fn default_connect_timeout_ms() -> u64 {
    10_000
}

const fn default_retry_max_attempts() -> u32 {
    MAX_TRANSIENT_ATTEMPTS
}

const fn default_retry_backoff_ms() -> u64 {
    1_000
}

/// HTTP transport tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Attempts per call when a request fails in transit (1 or 2).
    ///
    /// Each attempt is admitted by the rate governor. HTTP error statuses
    /// are never retried here.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Delay before the transient retry.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl HttpConfig {
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// GitHub account and endpoint configuration.
///
/// The token is only ever read from `GITHUB_TOKEN`.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Account login; overridden by `GITHUB_USERNAME` when set.
    #[serde(default)]
    pub username: Option<String>,

    /// Page size for list endpoints (1..=100).
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Hard cap on pages per listing.
    ///
    /// Guards against a misbehaving API that never returns a short page.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            username: None,
            per_page: default_per_page(),
            max_pages: default_max_pages(),
            http: HttpConfig::default(),
            token: None,
        }
    }
}
