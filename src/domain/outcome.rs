//! Bulk mutation outcomes and batch reports.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::entity::Entity;
use super::id::{EntityId, Handle};
use super::relation::RelationshipSet;

/// Relationship-changing operation applied to a single account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Follow,
    Unfollow,
}

impl MutationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::Unfollow => "unfollow",
        }
    }

    /// Whether `following` already shows this operation applied to `id`.
    #[must_use]
    pub fn is_reflected_in(self, following: &RelationshipSet, id: EntityId) -> bool {
        match self {
            Self::Follow => following.contains(id),
            Self::Unfollow => !following.contains(id),
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a candidate was skipped rather than failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// 404: the account vanished or the relationship is already absent.
    NotFound,
    /// The handle was blank after trimming; no call was made.
    InvalidHandle,
    /// The relationship was already in the requested state; no call was made.
    AlreadyApplied,
}

/// Error class of a failed candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Auth,
    RateLimited,
    Transient,
    Unexpected,
}

/// Diagnostics attached to a failed candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    pub kind: FailureKind,
    /// Raw HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Retry-after hint from the response, in seconds.
    pub retry_after_secs: Option<u64>,
    pub message: String,
}

/// Result tag of one attempted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum OutcomeStatus {
    Succeeded,
    Skipped { reason: SkipReason },
    Failed(FailureDetail),
}

/// One record per candidate the executor acted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub handle: Handle,
    pub id: Option<EntityId>,
    pub status: OutcomeStatus,
    /// Number of calls issued for this candidate (0, 1, or 2 with a retry).
    pub attempts: u8,
}

impl MutationOutcome {
    pub(crate) fn for_entity(entity: &Entity, status: OutcomeStatus, attempts: u8) -> Self {
        Self {
            handle: entity.handle().clone(),
            id: Some(entity.id()),
            status,
            attempts,
        }
    }

    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded)
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, OutcomeStatus::Skipped { .. })
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed(_))
    }
}

/// Why a batch ended before exhausting its candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Cancelled,
    /// The credential was rejected (401); every remaining call would fail too.
    Unauthorized,
}

/// Ordered outcomes of one executor invocation plus aggregate counts.
///
/// Built by the executor and handed back to the caller; there is no
/// public way to mutate it afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    operation: MutationKind,
    limit: usize,
    candidates_available: usize,
    outcomes: Vec<MutationOutcome>,
    succeeded: usize,
    skipped: usize,
    failed: usize,
    stop: Option<StopReason>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub(crate) fn begin(
        operation: MutationKind,
        limit: usize,
        candidates_available: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            operation,
            limit,
            candidates_available,
            outcomes: Vec::new(),
            succeeded: 0,
            skipped: 0,
            failed: 0,
            stop: None,
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn record(&mut self, outcome: MutationOutcome) {
        match outcome.status {
            OutcomeStatus::Succeeded => self.succeeded += 1,
            OutcomeStatus::Skipped { .. } => self.skipped += 1,
            OutcomeStatus::Failed(_) => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    pub(crate) fn finish(mut self, stop: Option<StopReason>) -> Self {
        self.stop = stop;
        self.finished_at = Utc::now();
        self
    }

    #[must_use]
    pub const fn operation(&self) -> MutationKind {
        self.operation
    }

    /// The limit the caller requested.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Length of the candidate sequence handed to the executor.
    #[must_use]
    pub const fn candidates_available(&self) -> usize {
        self.candidates_available
    }

    #[must_use]
    pub fn outcomes(&self) -> &[MutationOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub const fn succeeded(&self) -> usize {
        self.succeeded
    }

    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    #[must_use]
    pub const fn failed(&self) -> usize {
        self.failed
    }

    #[must_use]
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub const fn stop(&self) -> Option<StopReason> {
        self.stop
    }

    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub const fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// True when nothing was requested (limit 0 or no candidates).
    ///
    /// Distinguishes an empty request from a batch where every
    /// candidate failed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.limit.min(self.candidates_available) == 0
    }

    /// Entities whose mutation succeeded, for post-batch verification.
    pub fn succeeded_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.outcomes
            .iter()
            .filter(|o| o.is_succeeded())
            .filter_map(|o| o.id)
    }
}

/// Progress event emitted after each candidate is processed.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    /// 1-based position within the bounded batch.
    pub position: usize,
    pub total: usize,
    pub outcome: MutationOutcome,
}
