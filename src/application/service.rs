//! Entry points for the presentation layer.
//!
//! [`GraphService`] wires the governed API, fetcher, executor and
//! verifier together from configuration. Every call recomputes from a
//! fresh fetch; nothing is carried over between invocations except the
//! shared rate governor.

use std::sync::Arc;

use tracing::info;

use super::analytics::{self, Analysis};
use super::cancel::CancelSignal;
use super::executor::{BulkExecutor, Candidate, ProgressObserver};
use super::fetcher::{FetchSettings, SetFetcher};
use super::governed::GovernedApi;
use super::governor::RateGovernor;
use super::verify::{VerificationReport, Verifier};
use crate::config::Config;
use crate::domain::{
    AccountSummary, BatchReport, Classification, Entity, Handle, MutationKind, RateStatus,
    RelationKind, RelationshipSet,
};
use crate::error::Result;
use crate::port::GraphApi;

/// Where a bulk operation takes its candidates from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    /// Accounts followed that do not follow back.
    NonMutuals,
    /// Followers not followed back.
    FollowBack,
    /// An explicit list, resolved one by one during the batch.
    Handles(Vec<Handle>),
}

/// How many candidates a batch may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchLimit {
    Count(usize),
    All,
}

impl BatchLimit {
    #[must_use]
    pub fn resolve(self, available: usize) -> usize {
        match self {
            Self::Count(n) => n,
            Self::All => available,
        }
    }
}

pub struct BulkRequest {
    pub operation: MutationKind,
    pub source: CandidateSource,
    pub limit: BatchLimit,
    /// Order candidates by handle (byte-wise) before applying the limit.
    pub sort: bool,
    pub observer: Option<ProgressObserver>,
}

impl BulkRequest {
    pub fn new(operation: MutationKind, source: CandidateSource, limit: BatchLimit) -> Self {
        Self {
            operation,
            source,
            limit,
            sort: false,
            observer: None,
        }
    }

    #[must_use]
    pub fn sorted(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }
}

/// Candidates and limit of a bulk request, resolved but not yet run.
#[derive(Debug, Clone)]
pub struct BulkPlan {
    pub operation: MutationKind,
    pub candidates: Vec<Candidate>,
    pub limit: usize,
    /// Following listing captured for explicit handles, so handles
    /// already in the requested state are skipped without a call.
    pub following: Option<RelationshipSet>,
}

impl BulkPlan {
    /// The candidates the batch will work through, in order.
    #[must_use]
    pub fn targets(&self) -> &[Candidate] {
        &self.candidates[..self.limit.min(self.candidates.len())]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets().is_empty()
    }
}

#[derive(Clone)]
pub struct GraphService {
    fetcher: SetFetcher,
    executor: BulkExecutor,
    verifier: Verifier,
    username: Option<Handle>,
}

impl GraphService {
    /// Build the service around an API client and the governor shared by
    /// every flow using the same credential.
    pub fn new(api: Arc<dyn GraphApi>, governor: Arc<RateGovernor>, config: &Config) -> Self {
        let http = &config.github.http;
        let governed = GovernedApi::new(api, governor)
            .with_transient_retry(http.retry_max_attempts, http.retry_backoff());
        let fetcher = SetFetcher::new(
            governed.clone(),
            FetchSettings {
                per_page: config.github.per_page,
                max_pages: config.github.max_pages,
            },
        );
        let executor =
            BulkExecutor::new(governed).with_rate_limit_retry(config.executor.retry_on_rate_limit);
        let verifier =
            Verifier::new(fetcher.clone(), config.verify.attempts, config.verify.backoff());

        Self {
            fetcher,
            executor,
            verifier,
            username: config.github.username.as_deref().map(Handle::new),
        }
    }

    pub async fn analyze(&self, cancel: &CancelSignal) -> Result<Analysis> {
        analytics::analyze(&self.fetcher, cancel).await
    }

    pub async fn get_account_summary(&self, cancel: &CancelSignal) -> Result<AccountSummary> {
        analytics::summarize(&self.fetcher, self.username.as_ref(), cancel).await
    }

    pub async fn get_classification(&self, cancel: &CancelSignal) -> Result<Classification> {
        Ok(self.analyze(cancel).await?.classification)
    }

    /// The candidates a bulk request would act on, in the order it would
    /// act on them, without issuing any mutation.
    pub async fn preview(
        &self,
        source: &CandidateSource,
        limit: BatchLimit,
        sort: bool,
        cancel: &CancelSignal,
    ) -> Result<Vec<Candidate>> {
        let mut candidates = self.candidates(source, sort, cancel).await?;
        let limit = limit.resolve(candidates.len());
        candidates.truncate(limit);
        Ok(candidates)
    }

    /// Resolve a request's candidates and limit without mutating anything.
    pub async fn plan(&self, request: &BulkRequest, cancel: &CancelSignal) -> Result<BulkPlan> {
        let candidates = self.candidates(&request.source, request.sort, cancel).await?;
        let limit = request.limit.resolve(candidates.len());
        let following = match request.source {
            CandidateSource::Handles(_) if limit > 0 => {
                Some(self.fetcher.fetch_all(RelationKind::Following, cancel).await?)
            }
            _ => None,
        };
        Ok(BulkPlan {
            operation: request.operation,
            candidates,
            limit,
            following,
        })
    }

    /// Execute a plan. Per-candidate failures end up in the report; only
    /// planning can fail.
    pub async fn execute_plan(
        &self,
        plan: &BulkPlan,
        observer: Option<ProgressObserver>,
        cancel: &CancelSignal,
    ) -> BatchReport {
        info!(
            operation = %plan.operation,
            available = plan.candidates.len(),
            limit = plan.limit,
            "Running bulk operation"
        );
        self.executor
            .execute_against(
                plan.operation,
                &plan.candidates,
                plan.limit,
                plan.following.as_ref(),
                cancel,
                observer,
            )
            .await
    }

    pub async fn run_bulk_operation(
        &self,
        request: BulkRequest,
        cancel: &CancelSignal,
    ) -> Result<BatchReport> {
        let plan = self.plan(&request, cancel).await?;
        Ok(self.execute_plan(&plan, request.observer, cancel).await)
    }

    /// Re-read the following listing until the batch's successes show up.
    pub async fn verify(
        &self,
        report: &BatchReport,
        cancel: &CancelSignal,
    ) -> Result<VerificationReport> {
        self.verifier.confirm(report, cancel).await
    }

    /// Budget as last reported to the shared governor.
    #[must_use]
    pub fn rate_status(&self) -> RateStatus {
        self.fetcher.api().governor().status()
    }

    async fn candidates(
        &self,
        source: &CandidateSource,
        sort: bool,
        cancel: &CancelSignal,
    ) -> Result<Vec<Candidate>> {
        let mut candidates: Vec<Candidate> = match source {
            CandidateSource::NonMutuals => {
                entity_candidates(self.analyze(cancel).await?.classification.non_mutual)
            }
            CandidateSource::FollowBack => {
                entity_candidates(self.analyze(cancel).await?.classification.follow_back)
            }
            CandidateSource::Handles(handles) => {
                handles.iter().cloned().map(Candidate::from).collect()
            }
        };
        if sort {
            candidates.sort_by(|a, b| a.handle().as_str().cmp(b.handle().as_str()));
        }
        Ok(candidates)
    }
}

fn entity_candidates(entities: Vec<Entity>) -> Vec<Candidate> {
    entities.into_iter().map(Candidate::from).collect()
}
