//! Bulk follow/unfollow executor.
//!
//! Processes candidates strictly in input order, one at a time, up to a
//! limit. A failing candidate never aborts the batch; its outcome is
//! recorded and the loop moves on. The only early exits are
//! cancellation and a rejected credential, and both still return the
//! outcomes gathered so far.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::cancel::CancelSignal;
use super::governed::GovernedApi;
use crate::domain::{
    BatchProgress, BatchReport, Entity, FailureDetail, FailureKind, Handle, MutationKind,
    MutationOutcome, OutcomeStatus, RelationshipSet, SkipReason, StopReason,
};
use crate::error::{ApiError, Error};
use crate::port::mutation_resource;

/// Callback invoked after each candidate.
pub type ProgressObserver = Arc<dyn Fn(&BatchProgress) + Send + Sync>;

/// One entry of the executor's input.
#[derive(Debug, Clone)]
pub enum Candidate {
    Entity(Entity),
    /// A bare handle, looked up right before it is mutated.
    Handle(Handle),
}

impl Candidate {
    #[must_use]
    pub fn handle(&self) -> &Handle {
        match self {
            Self::Entity(entity) => entity.handle(),
            Self::Handle(handle) => handle,
        }
    }
}

impl From<Handle> for Candidate {
    fn from(handle: Handle) -> Self {
        Self::Handle(handle)
    }
}

impl From<Entity> for Candidate {
    fn from(entity: Entity) -> Self {
        Self::Entity(entity)
    }
}

enum Resolution {
    Found(Entity),
    Settled(MutationOutcome),
    /// The lookup was rejected with a session-fatal status.
    Fatal(MutationOutcome),
    Cancelled,
}

/// Result of working one candidate.
enum Attempt {
    Done(MutationOutcome),
    /// Recorded, then the batch stops: the credential was rejected.
    Fatal(MutationOutcome),
    /// Cancelled before any call was issued for this candidate.
    Cancelled,
    /// Cancelled while waiting for the retry; the first attempt's outcome
    /// is kept.
    CancelledAfter(MutationOutcome),
}

/// Fixed parameters of one run.
#[derive(Clone, Copy)]
struct Batch<'a> {
    operation: MutationKind,
    limit: usize,
    available: usize,
    following: Option<&'a RelationshipSet>,
}

#[derive(Clone)]
pub struct BulkExecutor {
    api: GovernedApi,
    retry_on_rate_limit: bool,
}

impl BulkExecutor {
    pub fn new(api: GovernedApi) -> Self {
        Self {
            api,
            retry_on_rate_limit: true,
        }
    }

    #[must_use]
    pub fn with_rate_limit_retry(mut self, enabled: bool) -> Self {
        self.retry_on_rate_limit = enabled;
        self
    }

    /// Apply `operation` to the first `limit` entities of `candidates`.
    pub async fn execute(
        &self,
        operation: MutationKind,
        candidates: &[Entity],
        limit: usize,
        cancel: &CancelSignal,
    ) -> BatchReport {
        let available = candidates.len();
        let candidates: Vec<Candidate> = candidates
            .iter()
            .take(limit)
            .cloned()
            .map(Candidate::from)
            .collect();
        let batch = Batch {
            operation,
            limit,
            available,
            following: None,
        };
        self.run(&batch, &candidates, cancel, None).await
    }

    /// Like [`execute`](Self::execute), over mixed candidates, with an
    /// optional progress observer.
    pub async fn execute_candidates(
        &self,
        operation: MutationKind,
        candidates: &[Candidate],
        limit: usize,
        cancel: &CancelSignal,
        observer: Option<ProgressObserver>,
    ) -> BatchReport {
        self.execute_against(operation, candidates, limit, None, cancel, observer)
            .await
    }

    /// Like [`execute_candidates`](Self::execute_candidates), skipping
    /// every candidate whose relationship `following` already shows in
    /// the requested state. No call is issued for those.
    pub async fn execute_against(
        &self,
        operation: MutationKind,
        candidates: &[Candidate],
        limit: usize,
        following: Option<&RelationshipSet>,
        cancel: &CancelSignal,
        observer: Option<ProgressObserver>,
    ) -> BatchReport {
        let batch = Batch {
            operation,
            limit,
            available: candidates.len(),
            following,
        };
        self.run(&batch, candidates, cancel, observer).await
    }

    async fn run(
        &self,
        batch: &Batch<'_>,
        candidates: &[Candidate],
        cancel: &CancelSignal,
        observer: Option<ProgressObserver>,
    ) -> BatchReport {
        let Batch {
            operation,
            limit,
            available,
            following,
        } = *batch;
        let mut report = BatchReport::begin(operation, limit, available);
        let total = limit.min(candidates.len());
        let mut stop = None;

        info!(%operation, total, available, "Starting batch");

        for (index, candidate) in candidates.iter().take(total).enumerate() {
            if cancel.is_cancelled() {
                stop = Some(StopReason::Cancelled);
                break;
            }

            let attempt = match candidate {
                Candidate::Entity(entity) => {
                    self.process(operation, entity, following, cancel).await
                }
                Candidate::Handle(handle) => match self.resolve(handle, cancel).await {
                    Resolution::Found(entity) => {
                        self.process(operation, &entity, following, cancel).await
                    }
                    Resolution::Settled(outcome) => Attempt::Done(outcome),
                    Resolution::Fatal(outcome) => Attempt::Fatal(outcome),
                    Resolution::Cancelled => Attempt::Cancelled,
                },
            };
            let (outcome, halt) = match attempt {
                Attempt::Done(outcome) => (outcome, None),
                Attempt::Fatal(outcome) => (outcome, Some(StopReason::Unauthorized)),
                Attempt::CancelledAfter(outcome) => (outcome, Some(StopReason::Cancelled)),
                Attempt::Cancelled => {
                    stop = Some(StopReason::Cancelled);
                    break;
                }
            };

            Self::log_outcome(operation, &outcome);
            if let Some(observer) = &observer {
                observer(&BatchProgress {
                    position: index + 1,
                    total,
                    outcome: outcome.clone(),
                });
            }
            report.record(outcome);

            if let Some(reason) = halt {
                if reason == StopReason::Unauthorized {
                    warn!(%operation, "Credential rejected, stopping batch");
                }
                stop = Some(reason);
                break;
            }
        }

        let report = report.finish(stop);
        info!(
            %operation,
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            stopped = ?report.stop(),
            "Batch complete"
        );
        report
    }

    /// Look up a bare handle. A blank handle or a 404 settles the
    /// candidate as skipped; any other lookup failure settles it as failed.
    async fn resolve(&self, handle: &Handle, cancel: &CancelSignal) -> Resolution {
        let unresolved = |status| MutationOutcome {
            handle: handle.clone(),
            id: None,
            status,
            attempts: 0,
        };
        if handle.is_empty() {
            return Resolution::Settled(unresolved(OutcomeStatus::Skipped {
                reason: SkipReason::InvalidHandle,
            }));
        }

        let response = match self.api.user(handle, cancel).await {
            Ok(response) => response,
            Err(Error::Cancelled) => return Resolution::Cancelled,
            Err(err) => {
                let outcome = unresolved(OutcomeStatus::Failed(error_detail(&err)));
                return if err.api_error().is_some_and(ApiError::is_session_fatal) {
                    Resolution::Fatal(outcome)
                } else {
                    Resolution::Settled(outcome)
                };
            }
        };

        let status = response.status;
        match response.into_result(&format!("/users/{handle}")) {
            Ok(Some(entity)) => Resolution::Found(entity),
            Ok(None) | Err(ApiError::NotFound { .. }) => {
                debug!(%handle, "Handle did not resolve");
                Resolution::Settled(unresolved(OutcomeStatus::Skipped {
                    reason: SkipReason::NotFound,
                }))
            }
            Err(err) => {
                let outcome = unresolved(OutcomeStatus::Failed(failure_detail(&err, Some(status))));
                if err.is_session_fatal() {
                    Resolution::Fatal(outcome)
                } else {
                    Resolution::Settled(outcome)
                }
            }
        }
    }

    async fn process(
        &self,
        operation: MutationKind,
        entity: &Entity,
        following: Option<&RelationshipSet>,
        cancel: &CancelSignal,
    ) -> Attempt {
        let skip = |reason| {
            Attempt::Done(MutationOutcome::for_entity(
                entity,
                OutcomeStatus::Skipped { reason },
                0,
            ))
        };
        if entity.handle().is_empty() {
            return skip(SkipReason::InvalidHandle);
        }
        if following.is_some_and(|set| operation.is_reflected_in(set, entity.id())) {
            debug!(%operation, handle = %entity.handle(), "Already in the requested state");
            return skip(SkipReason::AlreadyApplied);
        }
        self.attempt(operation, entity, cancel).await
    }

    async fn attempt(
        &self,
        operation: MutationKind,
        entity: &Entity,
        cancel: &CancelSignal,
    ) -> Attempt {
        let handle = entity.handle();
        let resource = mutation_resource(handle);
        let mut attempts: u8 = 0;

        loop {
            attempts += 1;
            let response = match self.api.mutate(operation, handle, cancel).await {
                Ok(response) => response,
                Err(Error::Cancelled) if attempts == 1 => return Attempt::Cancelled,
                Err(Error::Cancelled) => {
                    let detail = FailureDetail {
                        kind: FailureKind::RateLimited,
                        status: Some(429),
                        retry_after_secs: None,
                        message: "rate limited; retry cancelled".into(),
                    };
                    return Attempt::CancelledAfter(MutationOutcome::for_entity(
                        entity,
                        OutcomeStatus::Failed(detail),
                        attempts - 1,
                    ));
                }
                Err(err) => {
                    let fatal = err.api_error().is_some_and(ApiError::is_session_fatal);
                    let outcome = MutationOutcome::for_entity(
                        entity,
                        OutcomeStatus::Failed(error_detail(&err)),
                        attempts,
                    );
                    return if fatal {
                        Attempt::Fatal(outcome)
                    } else {
                        Attempt::Done(outcome)
                    };
                }
            };

            if response.is_success() {
                return Attempt::Done(MutationOutcome::for_entity(
                    entity,
                    OutcomeStatus::Succeeded,
                    attempts,
                ));
            }

            let status = response.status;
            let error = response.to_error(&resource);
            match error {
                ApiError::NotFound { .. } => {
                    return Attempt::Done(MutationOutcome::for_entity(
                        entity,
                        OutcomeStatus::Skipped {
                            reason: SkipReason::NotFound,
                        },
                        attempts,
                    ));
                }
                ApiError::RateLimited { .. } if attempts == 1 && self.retry_on_rate_limit => {
                    // The governor has already been resynchronized from
                    // this response, so the retry's acquire waits as needed.
                    debug!(%handle, "Rate limited, retrying once");
                    continue;
                }
                other => {
                    let outcome = MutationOutcome::for_entity(
                        entity,
                        OutcomeStatus::Failed(failure_detail(&other, Some(status))),
                        attempts,
                    );
                    return if other.is_session_fatal() {
                        Attempt::Fatal(outcome)
                    } else {
                        Attempt::Done(outcome)
                    };
                }
            }
        }
    }

    fn log_outcome(operation: MutationKind, outcome: &MutationOutcome) {
        match &outcome.status {
            OutcomeStatus::Succeeded => info!(%operation, handle = %outcome.handle, "Applied"),
            OutcomeStatus::Skipped { reason } => {
                info!(%operation, handle = %outcome.handle, reason = ?reason, "Skipped");
            }
            OutcomeStatus::Failed(detail) => warn!(
                %operation,
                handle = %outcome.handle,
                kind = ?detail.kind,
                status = ?detail.status,
                error = %detail.message,
                "Failed"
            ),
        }
    }
}

fn error_detail(err: &Error) -> FailureDetail {
    match err.api_error() {
        Some(api_err) => failure_detail(api_err, None),
        None => FailureDetail {
            kind: FailureKind::Unexpected,
            status: None,
            retry_after_secs: None,
            message: err.to_string(),
        },
    }
}

fn failure_detail(error: &ApiError, status: Option<u16>) -> FailureDetail {
    let retry_after_secs = match error {
        ApiError::RateLimited { retry_after, .. } => retry_after.map(|d| d.as_secs()),
        _ => None,
    };
    let status = status.or(match error {
        ApiError::Auth { status, .. } | ApiError::Unexpected { status, .. } => Some(*status),
        _ => None,
    });
    FailureDetail {
        kind: error.failure_kind(),
        status,
        retry_after_secs,
        message: error.to_string(),
    }
}
