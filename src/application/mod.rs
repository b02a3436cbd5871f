//! Application services (use cases).
//!
//! These services orchestrate domain logic and reach the remote API only
//! through [`GovernedApi`], so every outbound call is admitted by the
//! shared [`RateGovernor`].

mod analytics;
mod cancel;
mod executor;
mod fetcher;
mod governed;
mod governor;
mod service;
mod verify;

pub use analytics::{analyze, summarize, Analysis};
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use executor::{BulkExecutor, Candidate, ProgressObserver};
pub use fetcher::{FetchSettings, SetFetcher};
pub use governed::GovernedApi;
pub use governor::{Admission, GovernorSettings, RateGovernor, SpacingTier, WaitReason};
pub use service::{BatchLimit, BulkPlan, BulkRequest, CandidateSource, GraphService};
pub use verify::{VerificationReport, Verifier};
