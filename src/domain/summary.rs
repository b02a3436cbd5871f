//! Account summary statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::classification::Classification;
use super::entity::ProfileMeta;
use super::id::Handle;

/// Remaining request budget as last reported by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateStatus {
    pub remaining: u32,
    pub limit: u32,
    pub reset_at: Option<DateTime<Utc>>,
}

/// Canonical statistics surface for an account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub handle: Option<Handle>,
    pub profile: Option<ProfileMeta>,
    pub total_following: usize,
    pub total_followers: usize,
    pub mutual: usize,
    pub non_mutual: usize,
    pub follow_back: usize,
    /// followers / following; `None` when following is empty.
    pub follow_back_ratio: Option<f64>,
    pub rate: Option<RateStatus>,
}

impl AccountSummary {
    /// Compose a summary from set sizes and their classification.
    #[must_use]
    pub fn new(
        total_following: usize,
        total_followers: usize,
        classification: &Classification,
    ) -> Self {
        Self {
            handle: None,
            profile: None,
            total_following,
            total_followers,
            mutual: classification.mutual.len(),
            non_mutual: classification.non_mutual.len(),
            follow_back: classification.follow_back.len(),
            follow_back_ratio: ratio(total_followers, total_following),
            rate: None,
        }
    }

    #[must_use]
    pub fn with_profile(mut self, handle: Handle, profile: Option<ProfileMeta>) -> Self {
        self.handle = Some(handle);
        self.profile = profile;
        self
    }

    #[must_use]
    pub fn with_rate(mut self, rate: RateStatus) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Ratio as a percentage, for display.
    #[must_use]
    pub fn follow_back_percent(&self) -> Option<f64> {
        self.follow_back_ratio.map(|r| r * 100.0)
    }
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}
