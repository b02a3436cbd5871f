//! Rate governor shared by every outbound call made with one credential.
//!
//! The governor keeps a local estimate of the remaining request budget
//! and decides, before each call, whether the caller may proceed now or
//! must wait until a specific instant. Waits are exposed as explicit
//! [`Admission::WaitUntil`] values so they can be inspected and
//! cancelled; the only place that actually sleeps is [`RateGovernor::acquire`].
//!
//! After every response the estimate is overwritten with the values from
//! the response headers. Local accounting drifts when the same token is
//! used elsewhere, so headers always win.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::cancel::CancelSignal;
use crate::domain::RateStatus;
use crate::error::{Error, Result};
use crate::port::RateSnapshot;

/// Slower spacing once the remaining budget is at or below `below`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpacingTier {
    pub below: u32,
    pub interval: Duration,
}

/// Runtime governor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernorSettings {
    /// Minimum delay between two admitted calls.
    pub min_interval: Duration,
    /// Remaining-budget level at which callers wait for the window reset.
    pub safety_floor: u32,
    /// Budget assumed before any response has been seen.
    pub initial_budget: u32,
    /// Added to every reset-time wait to absorb clock skew.
    pub reset_grace: Duration,
    /// Back-off after a rate-limit response that carried no timing hint.
    pub rate_limit_backoff: Duration,
    pub tiers: Vec<SpacingTier>,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(500),
            safety_floor: 1,
            initial_budget: 5_000,
            reset_grace: Duration::from_secs(1),
            rate_limit_backoff: Duration::from_secs(60),
            tiers: Vec::new(),
        }
    }
}

impl GovernorSettings {
    /// Spacing to apply after a call, given the budget left.
    #[must_use]
    pub fn spacing_for(&self, remaining: u32) -> Duration {
        self.tiers
            .iter()
            .filter(|tier| remaining <= tier.below)
            .map(|tier| tier.interval)
            .fold(self.min_interval, Duration::max)
    }
}

/// Why a caller has to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    /// Minimum spacing since the previous call.
    Spacing,
    /// Budget at the safety floor; waiting for the window to reset.
    WindowReset,
    /// The server asked for a back-off.
    RetryAfter,
    /// A request failed in transit; waiting before it is resent.
    Backoff,
}

/// Governor decision for the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Ready,
    WaitUntil { at: Instant, reason: WaitReason },
}

#[derive(Debug)]
struct BudgetState {
    remaining: u32,
    limit: u32,
    window_reset: Option<DateTime<Utc>>,
    parked: Option<(Instant, WaitReason)>,
    next_slot: Option<Instant>,
}

/// Shared request-budget governor.
///
/// Share one instance per credential (wrap it in `Arc`); independent
/// instances for the same token double-count the budget.
///
/// # Thread Safety
///
/// State lives behind a `parking_lot::Mutex` that is never held across
/// an await point.
#[derive(Debug)]
pub struct RateGovernor {
    settings: GovernorSettings,
    state: Mutex<BudgetState>,
}

impl RateGovernor {
    #[must_use]
    pub fn new(settings: GovernorSettings) -> Self {
        let budget = settings.initial_budget;
        Self {
            settings,
            state: Mutex::new(BudgetState {
                remaining: budget,
                limit: budget,
                window_reset: None,
                parked: None,
                next_slot: None,
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &GovernorSettings {
        &self.settings
    }

    /// Inspect what the next `acquire` would do, without reserving a slot.
    #[must_use]
    pub fn admission(&self) -> Admission {
        let mut state = self.state.lock();
        self.plan(&mut state, Instant::now(), false)
    }

    /// Wait until a call is permitted, then reserve it.
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires while waiting.
    pub async fn acquire(&self, cancel: &CancelSignal) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let admission = {
                let mut state = self.state.lock();
                self.plan(&mut state, Instant::now(), true)
            };

            match admission {
                Admission::Ready => return Ok(()),
                Admission::WaitUntil { at, reason } => {
                    let wait = at.saturating_duration_since(Instant::now());
                    match reason {
                        WaitReason::Spacing | WaitReason::Backoff => debug!(
                            wait_ms = wait.as_millis() as u64,
                            reason = ?reason,
                            "Delaying outbound call"
                        ),
                        WaitReason::WindowReset | WaitReason::RetryAfter => info!(
                            wait_secs = wait.as_secs(),
                            reason = ?reason,
                            "Rate budget exhausted, waiting"
                        ),
                    }
                    tokio::select! {
                        () = sleep_until(at) => {}
                        () = cancel.cancelled() => return Err(Error::Cancelled),
                    }
                }
            }
        }
    }

    /// Resynchronize with the authoritative values from a response.
    pub fn report(&self, snapshot: &RateSnapshot) {
        if snapshot.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        if let Some(limit) = snapshot.limit {
            state.limit = limit;
        }
        if let Some(remaining) = snapshot.remaining {
            state.remaining = remaining;
            if remaining > self.settings.safety_floor
                && matches!(state.parked, Some((_, WaitReason::WindowReset)))
            {
                state.parked = None;
            }
        }
        if let Some(reset) = snapshot.reset {
            state.window_reset = Some(reset);
        }
        if let Some(retry_after) = snapshot.retry_after {
            Self::park(&mut state, Instant::now() + retry_after, WaitReason::RetryAfter);
        }
        debug!(
            remaining = state.remaining,
            limit = state.limit,
            reset = ?state.window_reset,
            "Rate budget resynchronized"
        );
    }

    /// Record a rate-limit response.
    ///
    /// Headers are applied first. Unless the response carried a
    /// `Retry-After`, or the budget is spent and its reset time is known,
    /// the governor backs off for `rate_limit_backoff`.
    pub fn note_rate_limited(&self, snapshot: &RateSnapshot) {
        self.report(snapshot);
        let mut state = self.state.lock();
        if snapshot.remaining == Some(0) {
            state.remaining = 0;
        }
        let reset_known =
            state.remaining <= self.settings.safety_floor && state.window_reset.is_some();
        if snapshot.retry_after.is_none() && !reset_known {
            let until = Instant::now() + self.settings.rate_limit_backoff;
            warn!(
                backoff_secs = self.settings.rate_limit_backoff.as_secs(),
                "Rate limited without a timing hint, backing off"
            );
            Self::park(&mut state, until, WaitReason::RetryAfter);
        }
    }

    /// Hold every caller back for `delay`, e.g. before resending a
    /// request that failed in transit.
    pub fn defer(&self, delay: Duration) {
        let mut state = self.state.lock();
        Self::park(&mut state, Instant::now() + delay, WaitReason::Backoff);
    }

    /// Current budget estimate.
    #[must_use]
    pub fn status(&self) -> RateStatus {
        let state = self.state.lock();
        RateStatus {
            remaining: state.remaining,
            limit: state.limit,
            reset_at: state.window_reset,
        }
    }

    fn park(state: &mut BudgetState, until: Instant, reason: WaitReason) {
        match state.parked {
            Some((existing, _)) if existing >= until => {}
            _ => state.parked = Some((until, reason)),
        }
    }

    fn plan(&self, state: &mut BudgetState, now: Instant, commit: bool) -> Admission {
        if let Some((until, reason)) = state.parked {
            if now < until {
                return Admission::WaitUntil { at: until, reason };
            }
            if commit {
                state.parked = None;
                if reason == WaitReason::WindowReset {
                    // The window rolled over; assume a full budget until
                    // the next response says otherwise.
                    state.remaining = state.limit;
                    state.window_reset = None;
                }
            }
        }

        if state.remaining <= self.settings.safety_floor {
            if let Some(reset) = state.window_reset {
                let until_reset = (reset - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                let at = now + until_reset + self.settings.reset_grace;
                if commit {
                    state.parked = Some((at, WaitReason::WindowReset));
                }
                return Admission::WaitUntil {
                    at,
                    reason: WaitReason::WindowReset,
                };
            }
            // No reset time known yet; let the call through so the
            // response headers can tell us where the window stands.
        }

        if let Some(slot) = state.next_slot {
            if now < slot {
                return Admission::WaitUntil {
                    at: slot,
                    reason: WaitReason::Spacing,
                };
            }
        }

        if commit {
            state.remaining = state.remaining.saturating_sub(1);
            state.next_slot = Some(now + self.settings.spacing_for(state.remaining));
        }
        Admission::Ready
    }
}
