//! Platform-agnostic domain types and pure algorithms.

mod classification;
mod entity;
mod id;
mod outcome;
mod relation;
mod summary;

pub use classification::{classify, Classification};
pub use entity::{Entity, ProfileMeta};
pub use id::{EntityId, Handle};
pub use outcome::{
    BatchProgress, BatchReport, FailureDetail, FailureKind, MutationKind, MutationOutcome,
    OutcomeStatus, SkipReason, StopReason,
};
pub use relation::{RelationKind, RelationshipSet, RelationshipSetBuilder};
pub use summary::{AccountSummary, RateStatus};
