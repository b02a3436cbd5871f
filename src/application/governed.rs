//! The only path from application code to the remote API.
//!
//! Every outbound request acquires a slot from the shared [`RateGovernor`]
//! first and reports the response's rate headers back afterwards. A
//! request that fails in transit may be resent once; the resend goes
//! through the governor like any other request. Fetcher, executor and
//! verifier hold a `GovernedApi`, never a bare [`GraphApi`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::cancel::CancelSignal;
use super::governor::RateGovernor;
use crate::domain::{Entity, Handle, MutationKind, RelationKind};
use crate::error::{ApiError, Result};
use crate::port::{ApiResponse, GraphApi};

type Reply<T> = std::result::Result<ApiResponse<T>, ApiError>;

#[derive(Clone)]
pub struct GovernedApi {
    api: Arc<dyn GraphApi>,
    governor: Arc<RateGovernor>,
    transient_attempts: u32,
    transient_backoff: Duration,
}

impl GovernedApi {
    /// Wrap `api`. Transient failures are not resent until
    /// [`with_transient_retry`](Self::with_transient_retry) says so.
    pub fn new(api: Arc<dyn GraphApi>, governor: Arc<RateGovernor>) -> Self {
        Self {
            api,
            governor,
            transient_attempts: 1,
            transient_backoff: Duration::ZERO,
        }
    }

    /// Send each request up to `max_attempts` times while it fails in
    /// transit, holding the governor back for `backoff` in between.
    #[must_use]
    pub fn with_transient_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.transient_attempts = max_attempts.max(1);
        self.transient_backoff = backoff;
        self
    }

    #[must_use]
    pub fn governor(&self) -> &Arc<RateGovernor> {
        &self.governor
    }

    #[must_use]
    pub fn platform_name(&self) -> &'static str {
        self.api.platform_name()
    }

    pub async fn list_page(
        &self,
        kind: RelationKind,
        page: u32,
        per_page: u32,
        cancel: &CancelSignal,
    ) -> Result<ApiResponse<Vec<Entity>>> {
        let api = &self.api;
        self.call(cancel, move || api.list_page(kind, page, per_page))
            .await
    }

    pub async fn mutate(
        &self,
        kind: MutationKind,
        handle: &Handle,
        cancel: &CancelSignal,
    ) -> Result<ApiResponse<()>> {
        let api = &self.api;
        self.call(cancel, move || api.mutate(kind, handle)).await
    }

    pub async fn user(
        &self,
        handle: &Handle,
        cancel: &CancelSignal,
    ) -> Result<ApiResponse<Option<Entity>>> {
        let api = &self.api;
        self.call(cancel, move || api.user(handle)).await
    }

    pub async fn viewer(&self, cancel: &CancelSignal) -> Result<ApiResponse<Option<Entity>>> {
        let api = &self.api;
        self.call(cancel, move || api.viewer()).await
    }

    /// Acquire, send, observe. Every send is preceded by its own acquire.
    async fn call<T, F, Fut>(&self, cancel: &CancelSignal, send: F) -> Result<ApiResponse<T>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Reply<T>>,
    {
        let mut attempt = 1;
        loop {
            self.governor.acquire(cancel).await?;
            match send().await {
                Err(ApiError::Transient(message)) if attempt < self.transient_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.transient_attempts,
                        error = %message,
                        "Request failed in transit, retrying"
                    );
                    self.governor.defer(self.transient_backoff);
                    attempt += 1;
                }
                reply => return self.observe(reply),
            }
        }
    }

    fn observe<T>(&self, response: Reply<T>) -> Result<ApiResponse<T>> {
        let response = response?;
        debug!(status = response.status, "API response");
        if !response.is_success() && matches!(response.to_error(""), ApiError::RateLimited { .. })
        {
            self.governor.note_rate_limited(&response.rate);
        } else {
            self.governor.report(&response.rate);
        }
        Ok(response)
    }
}
