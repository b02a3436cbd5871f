//! Best-effort confirmation that a batch's mutations took effect.
//!
//! The following listing can lag behind mutation responses, so a success
//! reported by the executor is only confirmed once a fresh listing agrees.
//! Verification never alters the batch report it checks.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::cancel::CancelSignal;
use super::fetcher::SetFetcher;
use crate::domain::{BatchReport, EntityId, RelationKind};
use crate::error::{Error, Result};

/// Ids confirmed by a fresh listing, and those still pending after the
/// last attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub confirmed: Vec<EntityId>,
    pub pending: Vec<EntityId>,
    /// Listings fetched.
    pub attempts: u32,
}

impl VerificationReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

#[derive(Clone)]
pub struct Verifier {
    fetcher: SetFetcher,
    attempts: u32,
    backoff: Duration,
}

impl Verifier {
    pub fn new(fetcher: SetFetcher, attempts: u32, backoff: Duration) -> Self {
        Self {
            fetcher,
            attempts: attempts.max(1),
            backoff,
        }
    }

    pub async fn confirm(
        &self,
        report: &BatchReport,
        cancel: &CancelSignal,
    ) -> Result<VerificationReport> {
        let mut pending: BTreeSet<EntityId> = report.succeeded_ids().collect();
        let mut confirmed = Vec::new();
        let mut attempts = 0;

        if pending.is_empty() {
            return Ok(VerificationReport::default());
        }

        while attempts < self.attempts && !pending.is_empty() {
            if attempts > 0 {
                debug!(backoff = ?self.backoff, pending = pending.len(), "Waiting before re-check");
                tokio::select! {
                    () = tokio::time::sleep(self.backoff) => {}
                    () = cancel.cancelled() => return Err(Error::Cancelled),
                }
            }
            attempts += 1;

            let following = self.fetcher.fetch_all(RelationKind::Following, cancel).await?;
            let settled: Vec<EntityId> = pending
                .iter()
                .copied()
                .filter(|id| report.operation().is_reflected_in(&following, *id))
                .collect();
            for id in settled {
                pending.remove(&id);
                confirmed.push(id);
            }
            debug!(
                attempt = attempts,
                confirmed = confirmed.len(),
                pending = pending.len(),
                "Verification pass"
            );
        }

        if pending.is_empty() {
            info!(confirmed = confirmed.len(), attempts, "All mutations confirmed");
        } else {
            warn!(pending = pending.len(), attempts, "Some mutations not yet visible");
        }

        Ok(VerificationReport {
            confirmed,
            pending: pending.into_iter().collect(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::application::{
        BulkExecutor, FetchSettings, GovernedApi, GovernorSettings, RateGovernor,
    };
    use crate::domain::MutationKind;
    use crate::testkit::api::ScriptedApi;
    use crate::testkit::domain::entities;

    fn governed(api: Arc<ScriptedApi>) -> GovernedApi {
        GovernedApi::new(api, Arc::new(RateGovernor::new(GovernorSettings::default())))
    }

    #[tokio::test(start_paused = true)]
    async fn confirms_after_listing_catches_up() {
        // First listing still shows user1; the second has caught up.
        let api = Arc::new(
            ScriptedApi::new().with_following_snapshots(vec![entities(1..=3), entities(2..=3)]),
        );
        let governed = governed(api);
        let report = BulkExecutor::new(governed.clone())
            .execute(MutationKind::Unfollow, &entities(1..=1), 1, &CancelSignal::never())
            .await;

        let verifier = Verifier::new(
            SetFetcher::new(governed, FetchSettings::default()),
            3,
            Duration::from_secs(5),
        );
        let verification = verifier.confirm(&report, &CancelSignal::never()).await.unwrap();

        assert_eq!(verification.confirmed, vec![EntityId::new(1)]);
        assert!(verification.is_complete());
        assert_eq!(verification.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_pending_after_exhausting_attempts() {
        let api = Arc::new(ScriptedApi::new().with_following(entities(1..=3)));
        let governed = governed(api);
        let report = BulkExecutor::new(governed.clone())
            .execute(MutationKind::Unfollow, &entities(1..=2), 2, &CancelSignal::never())
            .await;

        let verification = Verifier::new(
            SetFetcher::new(governed, FetchSettings::default()),
            2,
            Duration::from_secs(1),
        )
        .confirm(&report, &CancelSignal::never())
        .await
        .unwrap();

        assert!(verification.confirmed.is_empty());
        assert_eq!(verification.pending, vec![EntityId::new(1), EntityId::new(2)]);
        assert_eq!(report.succeeded(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn follow_is_confirmed_by_presence() {
        let api = Arc::new(ScriptedApi::new().with_following(entities(1..=2)));
        let governed = governed(api);
        let report = BulkExecutor::new(governed.clone())
            .execute(MutationKind::Follow, &entities(2..=2), 1, &CancelSignal::never())
            .await;

        let verification = Verifier::new(
            SetFetcher::new(governed, FetchSettings::default()),
            1,
            Duration::ZERO,
        )
        .confirm(&report, &CancelSignal::never())
        .await
        .unwrap();
        assert_eq!(verification.confirmed, vec![EntityId::new(2)]);
    }
}
