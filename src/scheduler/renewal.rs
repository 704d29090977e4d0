//! Throttled horizon renewal decision.
//!
//! [`RenewalPolicy::decide`] never reads the clock; callers pass `now`, which
//! keeps the decision reproducible in tests and safe to call from any tick.

use crate::config::RenewalConfig;
use crate::scheduler::state::RenewalState;
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Outcome of a renewal check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalDecision {
    /// Extend the horizon now.
    Renew,
    /// A renewal ran too recently.
    Throttled,
    /// Enough days are still scheduled.
    HorizonHealthy,
}

impl RenewalDecision {
    pub fn should_renew(self) -> bool {
        self == Self::Renew
    }
}

/// Renewal parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalPolicy {
    pub min_interval: Duration,
    pub lead_days: u32,
    pub horizon_days: u32,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self::from_config(&RenewalConfig::default())
    }
}

impl RenewalPolicy {
    pub fn from_config(config: &RenewalConfig) -> Self {
        Self {
            min_interval: i64::try_from(config.min_interval_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
            lead_days: config.lead_days,
            horizon_days: config.horizon_days,
        }
    }

    /// Decide whether the horizon must be extended at `now`.
    ///
    /// A recorded attempt later than `now` means the clock moved backwards;
    /// it does not throttle.
    pub fn decide(&self, state: &RenewalState, now: NaiveDateTime) -> RenewalDecision {
        if let Some(last) = state.last_renewal_attempt {
            if last <= now && now - last <= self.min_interval {
                return RenewalDecision::Throttled;
            }
        }

        if let Some(last_date) = state.last_scheduled_date {
            let renew_from = last_date - Duration::days(i64::from(self.lead_days));
            if now.date() < renew_from {
                return RenewalDecision::HorizonHealthy;
            }
        }

        RenewalDecision::Renew
    }

    pub fn should_renew(&self, state: &RenewalState, now: NaiveDateTime) -> bool {
        self.decide(state, now).should_renew()
    }

    /// Inclusive date window a renewal starting on `today` schedules.
    pub fn window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let span = i64::from(self.horizon_days.max(1)) - 1;
        (today, today + Duration::days(span))
    }
}
