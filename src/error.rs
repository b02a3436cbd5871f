use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{FailureKind, RelationKind};

/// Scope the token must carry for follow/unfollow and list calls.
pub const REQUIRED_SCOPE: &str = "user:follow";

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Remote API failures, classified so callers can pick a remediation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error(
        "authentication failed ({status}): {message}; check that the token is valid and has the `user:follow` scope"
    )]
    Auth { status: u16, message: String },

    #[error("rate limit exhausted{}", reset_suffix(.reset))]
    RateLimited {
        reset: Option<DateTime<Utc>>,
        retry_after: Option<Duration>,
    },

    #[error("transient network error: {0}")]
    Transient(String),

    #[error(
        "not found: {resource} (an under-scoped token also reports 404; make sure it has `user:follow`)"
    )]
    NotFound { resource: String },

    #[error("unexpected response {status}: {message}")]
    Unexpected { status: u16, message: String },
}

fn reset_suffix(reset: &Option<DateTime<Utc>>) -> String {
    reset
        .map(|r| format!(", resets at {}", r.format("%H:%M:%S UTC")))
        .unwrap_or_default()
}

impl ApiError {
    /// Map a non-success status into the taxonomy.
    ///
    /// A 403 with zero remaining budget is GitHub's primary rate limit
    /// and a 403 with `Retry-After` is a secondary limit; both classify
    /// as `RateLimited`, not `Auth`.
    #[must_use]
    pub fn from_status(
        status: u16,
        resource: &str,
        remaining: Option<u32>,
        reset: Option<DateTime<Utc>>,
        retry_after: Option<Duration>,
        message: impl Into<String>,
    ) -> Self {
        let rate_limited = status == 429
            || (status == 403 && (remaining == Some(0) || retry_after.is_some()));
        match status {
            _ if rate_limited => Self::RateLimited { reset, retry_after },
            401 | 403 => Self::Auth {
                status,
                message: message.into(),
            },
            404 => Self::NotFound {
                resource: resource.to_string(),
            },
            _ => Self::Unexpected {
                status,
                message: message.into(),
            },
        }
    }

    /// Whether the whole session should stop (credential rejected).
    #[must_use]
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Auth { status: 401, .. })
    }

    #[must_use]
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Auth { .. } => FailureKind::Auth,
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::Transient(_) => FailureKind::Transient,
            Self::NotFound { .. } | Self::Unexpected { .. } => FailureKind::Unexpected,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to fetch {kind} (page {page}): {source}")]
    FetchFailed {
        kind: RelationKind,
        page: u32,
        #[source]
        source: ApiError,
    },

    #[error("{kind} listing exceeded {max_pages} pages; refusing to continue")]
    PageLimitExceeded { kind: RelationKind, max_pages: u32 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// The API error behind this failure, if any.
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) | Self::FetchFailed { source: err, .. } => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        // dialoguer::Error wraps an IO error
        Error::Io(std::io::Error::other(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(status: u16, remaining: Option<u32>, retry: Option<u64>) -> ApiError {
        ApiError::from_status(
            status,
            "/user/following/x",
            remaining,
            None,
            retry.map(Duration::from_secs),
            "msg",
        )
    }

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert!(matches!(classify(401, Some(10), None), ApiError::Auth { status: 401, .. }));
        assert!(matches!(classify(403, Some(10), None), ApiError::Auth { status: 403, .. }));
        assert!(matches!(classify(404, None, None), ApiError::NotFound { .. }));
        assert!(matches!(classify(429, None, None), ApiError::RateLimited { .. }));
        assert!(matches!(classify(500, None, None), ApiError::Unexpected { status: 500, .. }));
    }

    #[test]
    fn forbidden_with_empty_budget_is_rate_limit() {
        assert!(matches!(classify(403, Some(0), None), ApiError::RateLimited { .. }));
        assert!(matches!(classify(403, Some(50), Some(60)), ApiError::RateLimited { .. }));
    }

    #[test]
    fn auth_and_not_found_messages_mention_scope() {
        assert!(classify(401, None, None).to_string().contains(REQUIRED_SCOPE));
        assert!(classify(404, None, None).to_string().contains(REQUIRED_SCOPE));
    }

    #[test]
    fn only_unauthorized_is_session_fatal() {
        assert!(classify(401, None, None).is_session_fatal());
        assert!(!classify(403, Some(10), None).is_session_fatal());
        assert!(!classify(500, None, None).is_session_fatal());
    }

    #[test]
    fn fetch_failed_exposes_api_error() {
        let err = Error::FetchFailed {
            kind: RelationKind::Followers,
            page: 3,
            source: ApiError::Transient("reset".into()),
        };
        assert!(err.to_string().contains("page 3"));
        assert_eq!(err.api_error(), Some(&ApiError::Transient("reset".into())));
    }
}
