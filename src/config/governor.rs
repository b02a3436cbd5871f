//! Rate governor configuration.
//!
//! Controls request spacing and what happens when the hourly budget runs
//! low. Durations are expressed in milliseconds in the file.

use std::time::Duration;

use serde::Deserialize;

use crate::application::{GovernorSettings, SpacingTier};

const fn default_min_interval_ms() -> u64 {
    500
}

const fn default_safety_floor() -> u32 {
    1
}

const fn default_initial_budget() -> u32 {
    5_000
}

const fn default_reset_grace_ms() -> u64 {
    1_000
}

const fn default_rate_limit_backoff_ms() -> u64 {
    60_000
}

fn default_tiers() -> Vec<SpacingTierConfig> {
    vec![
        SpacingTierConfig {
            below: 1_000,
            interval_ms: 1_000,
        },
        SpacingTierConfig {
            below: 100,
            interval_ms: 2_000,
        },
    ]
}

/// Slower spacing once the remaining budget drops below a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SpacingTierConfig {
    /// Applies when remaining budget is at or below this value.
    pub below: u32,
    pub interval_ms: u64,
}

/// Rate governor settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GovernorConfig {
    /// Minimum delay between consecutive outbound calls.
    ///
    /// Applied even when the budget is plentiful. Defaults to 500ms.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// When the local estimate reaches this value, callers wait for the
    /// window reset. Defaults to 1.
    #[serde(default = "default_safety_floor")]
    pub safety_floor: u32,

    /// Budget assumed before the first response arrives. Defaults to 5000.
    #[serde(default = "default_initial_budget")]
    pub initial_budget: u32,

    /// Extra wait past the reported reset time. Defaults to 1000ms.
    #[serde(default = "default_reset_grace_ms")]
    pub reset_grace_ms: u64,

    /// Back-off after a rate-limit response without `Retry-After` or
    /// reset headers. Defaults to 60s.
    #[serde(default = "default_rate_limit_backoff_ms")]
    pub rate_limit_backoff_ms: u64,

    /// Adaptive spacing tiers.
    #[serde(default = "default_tiers")]
    pub tiers: Vec<SpacingTierConfig>,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            safety_floor: default_safety_floor(),
            initial_budget: default_initial_budget(),
            reset_grace_ms: default_reset_grace_ms(),
            rate_limit_backoff_ms: default_rate_limit_backoff_ms(),
            tiers: default_tiers(),
        }
    }
}

impl GovernorConfig {
    /// Convert to runtime settings.
    #[must_use]
    pub fn to_settings(&self) -> GovernorSettings {
        GovernorSettings {
            min_interval: Duration::from_millis(self.min_interval_ms),
            safety_floor: self.safety_floor,
            initial_budget: self.initial_budget,
            reset_grace: Duration::from_millis(self.reset_grace_ms),
            rate_limit_backoff: Duration::from_millis(self.rate_limit_backoff_ms),
            tiers: self
                .tiers
                .iter()
                .map(|t| SpacingTier {
                    below: t.below,
                    interval: Duration::from_millis(t.interval_ms),
                })
                .collect(),
        }
    }
}
