//! Claim eligibility: a member may file once 365 days have passed since registration.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Minimum membership length, in days, before a claim may be filed.
pub const ELIGIBILITY_WINDOW_DAYS: i64 = 365;

/// Outcome of an eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    /// Whether the member may file a claim as of the checked date
    pub eligible: bool,
    /// Whole days between registration and the checked date
    pub days_elapsed: i64,
    /// Days left until eligible (0 once eligible)
    pub days_remaining: i64,
}

/// Decides eligibility for a member registered at `registration_date`, as of `as_of`.
///
/// Partial days are dropped. A check dated before registration counts as zero
/// elapsed days, so the result never decreases as `as_of` moves forward.
#[must_use]
pub fn check_eligibility(registration_date: DateTime<Utc>, as_of: DateTime<Utc>) -> Eligibility {
    let days_elapsed = (as_of - registration_date).num_days().max(0);
    Eligibility {
        eligible: days_elapsed >= ELIGIBILITY_WINDOW_DAYS,
        days_elapsed,
        days_remaining: (ELIGIBILITY_WINDOW_DAYS - days_elapsed).max(0),
    }
}
