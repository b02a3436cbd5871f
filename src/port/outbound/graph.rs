//! Social graph port for relationship listing and mutation.
//!
//! This is the only integration point with the remote platform. The
//! adapter owns transport, authentication headers and JSON decoding;
//! callers above it only see domain types plus the rate-limit metadata
//! every response carries.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Entity, Handle, MutationKind, RelationKind};
use crate::error::ApiError;

/// Rate-limit metadata reported by a response's headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateSnapshot {
    /// Total budget per window (`X-RateLimit-Limit`).
    pub limit: Option<u32>,
    /// Requests left in the current window (`X-RateLimit-Remaining`).
    pub remaining: Option<u32>,
    /// Instant the window resets (`X-RateLimit-Reset`).
    pub reset: Option<DateTime<Utc>>,
    /// Explicit back-off hint (`Retry-After`).
    pub retry_after: Option<Duration>,
}

impl RateSnapshot {
    /// Whether the response carried any rate-limit information at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.limit.is_none()
            && self.remaining.is_none()
            && self.reset.is_none()
            && self.retry_after.is_none()
    }
}

/// A response that reached the server, successful or not.
///
/// Transport failures never produce an `ApiResponse`; they surface as
/// `ApiError::Transient` from the port methods instead.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub rate: RateSnapshot,
    pub body: T,
    /// Error message from the body of a non-success response.
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Build a response with no rate metadata.
    pub fn new(status: u16, body: T) -> Self {
        Self {
            status,
            rate: RateSnapshot::default(),
            body,
            message: None,
        }
    }

    #[must_use]
    pub fn with_rate(mut self, rate: RateSnapshot) -> Self {
        self.rate = rate;
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Classify a non-success response into the error taxonomy.
    #[must_use]
    pub fn to_error(&self, resource: &str) -> ApiError {
        ApiError::from_status(
            self.status,
            resource,
            self.rate.remaining,
            self.rate.reset,
            self.rate.retry_after,
            self.message.clone().unwrap_or_else(|| "no response body".into()),
        )
    }

    /// Return the body on 2xx, the classified error otherwise.
    pub fn into_result(self, resource: &str) -> Result<T, ApiError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(self.to_error(resource))
        }
    }
}

/// Remote social graph API.
///
/// Implementations never sleep for rate limits themselves; governance is
/// applied by the caller through [`crate::application::GovernedApi`].
#[async_trait]
pub trait GraphApi: Send + Sync {
    /// Fetch one page (1-based) of a relationship listing.
    async fn list_page(
        &self,
        kind: RelationKind,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<Vec<Entity>>, ApiError>;

    /// Follow or unfollow a single account.
    async fn mutate(&self, kind: MutationKind, handle: &Handle)
        -> Result<ApiResponse<()>, ApiError>;

    /// Look up a single account by handle. `body` is `None` on non-2xx.
    async fn user(&self, handle: &Handle) -> Result<ApiResponse<Option<Entity>>, ApiError>;

    /// The authenticated account. `body` is `None` on non-2xx.
    async fn viewer(&self) -> Result<ApiResponse<Option<Entity>>, ApiError>;

    /// Platform name for logging.
    fn platform_name(&self) -> &'static str;
}

/// Resource path used in diagnostics for a listing call.
#[must_use]
pub fn list_resource(kind: RelationKind) -> String {
    format!("/user/{kind}")
}

/// Resource path used in diagnostics for a mutation call.
#[must_use]
pub fn mutation_resource(handle: &Handle) -> String {
    format!("/user/following/{handle}")
}
