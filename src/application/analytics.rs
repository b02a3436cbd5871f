//! Account analytics: fetch both sets, classify, summarize.

use tracing::{info, warn};

use super::cancel::CancelSignal;
use super::fetcher::SetFetcher;
use crate::domain::{
    classify, AccountSummary, Classification, Entity, Handle, RelationKind, RelationshipSet,
};
use crate::error::{Error, Result};

/// Both relationship sets plus their classification, from one run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub following: RelationshipSet,
    pub followers: RelationshipSet,
    pub classification: Classification,
}

impl Analysis {
    #[must_use]
    pub fn summary(&self) -> AccountSummary {
        AccountSummary::new(
            self.following.len(),
            self.followers.len(),
            &self.classification,
        )
    }
}

/// Fetch following then followers and classify them.
///
/// Nothing is reused between calls: each analysis reflects the remote
/// state at the time it ran.
pub async fn analyze(fetcher: &SetFetcher, cancel: &CancelSignal) -> Result<Analysis> {
    let following = fetcher.fetch_all(RelationKind::Following, cancel).await?;
    let followers = fetcher.fetch_all(RelationKind::Followers, cancel).await?;
    let classification = classify(&following, &followers);

    info!(
        following = following.len(),
        followers = followers.len(),
        mutual = classification.mutual.len(),
        non_mutual = classification.non_mutual.len(),
        follow_back = classification.follow_back.len(),
        "Classified relationships"
    );

    Ok(Analysis {
        following,
        followers,
        classification,
    })
}

/// Build the account summary, decorated with the account's profile and
/// the governor's current budget.
///
/// The profile lookup is best-effort; only a cancellation aborts.
pub async fn summarize(
    fetcher: &SetFetcher,
    username: Option<&Handle>,
    cancel: &CancelSignal,
) -> Result<AccountSummary> {
    let analysis = analyze(fetcher, cancel).await?;
    let api = fetcher.api();

    let lookup = match username {
        Some(handle) => api.user(handle, cancel).await,
        None => api.viewer(cancel).await,
    };
    let account: Option<Entity> = match lookup {
        Ok(response) if response.is_success() => response.body,
        Ok(response) => {
            warn!(status = response.status, "Profile lookup failed");
            None
        }
        Err(Error::Cancelled) => return Err(Error::Cancelled),
        Err(err) => {
            warn!(error = %err, "Profile lookup failed");
            None
        }
    };

    let mut summary = analysis.summary();
    if let Some(account) = account {
        summary = summary.with_profile(account.handle().clone(), account.profile().cloned());
    } else if let Some(handle) = username {
        summary = summary.with_profile(handle.clone(), None);
    }

    Ok(summary.with_rate(api.governor().status()))
}
