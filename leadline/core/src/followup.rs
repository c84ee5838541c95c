//! Follow-up Policy
//!
//! Decides whether an automated nudge may still be sent to a lead. The policy
//! is a pure predicate over [`LeadState`]; what periodically asks the question
//! lives in [`crate::scheduler`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::lead::{Category, LeadState};

/// Maximum automated follow-ups per category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowUpLimits {
    /// Limit for hot leads
    pub hot: u32,
    /// Limit for warm leads
    pub warm: u32,
    /// Limit for cold leads
    pub cold: u32,
}

impl Default for FollowUpLimits {
    fn default() -> Self {
        Self {
            hot: 8,
            warm: 5,
            cold: 3,
        }
    }
}

impl FollowUpLimits {
    /// Limit for a category
    pub fn limit(&self, category: Category) -> u32 {
        match category {
            Category::Hot => self.hot,
            Category::Warm => self.warm,
            Category::Cold => self.cold,
        }
    }
}

/// Why a lead is not eligible for a follow-up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ineligibility {
    /// Lead opted out
    DoNotContact,
    /// Category limit reached
    LimitReached {
        /// Follow-ups already sent
        sent: u32,
        /// Limit for the lead's current category
        limit: u32,
    },
    /// No contact in either direction yet
    NoActivity,
    /// Minimum quiet interval not yet elapsed
    TooSoon {
        /// Time left before the lead becomes eligible
        remaining: Duration,
    },
}

/// Follow-up eligibility policy
#[derive(Clone, Debug)]
pub struct FollowUpPolicy {
    limits: FollowUpLimits,
    min_interval: Duration,
}

impl Default for FollowUpPolicy {
    fn default() -> Self {
        Self::new(FollowUpLimits::default(), Duration::minutes(3))
    }
}

impl FollowUpPolicy {
    /// Create a policy with the given limits and quiet interval
    pub fn new(limits: FollowUpLimits, min_interval: Duration) -> Self {
        Self {
            limits,
            min_interval,
        }
    }

    /// Configured limits
    pub fn limits(&self) -> &FollowUpLimits {
        &self.limits
    }

    /// Minimum quiet interval
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Check eligibility with this policy's interval
    pub fn check(&self, lead: &LeadState, now: DateTime<Utc>) -> Result<(), Ineligibility> {
        check_eligibility(lead, now, self.min_interval, &self.limits)
    }

    /// Whether a follow-up may be sent now
    pub fn is_eligible(&self, lead: &LeadState, now: DateTime<Utc>) -> bool {
        self.check(lead, now).is_ok()
    }
}

/// Full eligibility check with the reason for refusal
///
/// The category limit is looked up on every call, since the lead may have
/// been reclassified since the last follow-up.
pub fn check_eligibility(
    lead: &LeadState,
    now: DateTime<Utc>,
    min_interval: Duration,
    limits: &FollowUpLimits,
) -> Result<(), Ineligibility> {
    if lead.dnc() {
        return Err(Ineligibility::DoNotContact);
    }

    let limit = limits.limit(lead.category());
    if lead.follow_up_count() >= limit {
        return Err(Ineligibility::LimitReached {
            sent: lead.follow_up_count(),
            limit,
        });
    }

    let last = lead.last_activity_at().ok_or(Ineligibility::NoActivity)?;
    let elapsed = now - last;
    if elapsed < min_interval {
        return Err(Ineligibility::TooSoon {
            remaining: min_interval - elapsed,
        });
    }

    Ok(())
}

/// Whether a follow-up may be sent, using the default limit table
pub fn is_eligible_for_follow_up(
    lead: &LeadState,
    now: DateTime<Utc>,
    min_interval_minutes: i64,
) -> bool {
    check_eligibility(
        lead,
        now,
        Duration::minutes(min_interval_minutes),
        &FollowUpLimits::default(),
    )
    .is_ok()
}
