//! Payment-month reconciliation.
//!
//! Pure calendar math over `YYYY-MM` months: which months a member owes since
//! registration, which of those completed payments already cover, and which
//! future months may be paid in advance. Nothing here touches the database.

use crate::{
    errors::{Error, Result},
    models::PaymentStatus,
};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeSet, fmt, str::FromStr};

/// Number of months after the current one offered for advance payment.
pub const ADVANCE_MONTHS: usize = 12;

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Builds a month, returning `None` unless `month` is in `1..=12`.
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Option<Self> {
        if month >= 1 && month <= 12 {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The month containing the given instant (UTC).
    #[must_use]
    pub fn of(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Month number, 1-12.
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// The following month.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding month.
    #[must_use]
    pub const fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Signed number of months from `self` to `later`.
    #[must_use]
    pub fn months_until(self, later: Self) -> i64 {
        (i64::from(later.year) - i64::from(self.year)) * 12
            + (i64::from(later.month) - i64::from(self.month))
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::validation(format!("Invalid month '{s}', expected YYYY-MM"));

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parses a list of `YYYY-MM` tokens into a deduplicated, ordered set.
pub fn parse_months<S: AsRef<str>>(tokens: &[S]) -> Result<BTreeSet<YearMonth>> {
    tokens.iter().map(|t| t.as_ref().trim().parse()).collect()
}

/// A payment as seen by reconciliation: who it covers, which months, and whether it settled.
pub trait SettledMonths {
    /// Member the payment covers.
    fn member_id(&self) -> i64;
    /// Current settlement status.
    fn status(&self) -> PaymentStatus;
    /// Months listed on the payment.
    fn months(&self) -> &[YearMonth];
}

/// Paid/pending split of a member's due months.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Due months covered by a completed payment
    pub paid: BTreeSet<YearMonth>,
    /// Due months still owed
    pub pending: BTreeSet<YearMonth>,
}

/// Months from the registration month through the `as_of` month, inclusive.
///
/// Empty when `as_of` falls in a month before registration.
#[must_use]
pub fn due_period(registration_date: DateTime<Utc>, as_of: DateTime<Utc>) -> Vec<YearMonth> {
    let last = YearMonth::of(as_of);
    let mut current = YearMonth::of(registration_date);
    let mut months = Vec::new();
    while current <= last {
        months.push(current);
        current = current.next();
    }
    months
}

/// The `count` months strictly after the `as_of` month.
#[must_use]
pub fn offerable_months(as_of: DateTime<Utc>, count: usize) -> Vec<YearMonth> {
    std::iter::successors(Some(YearMonth::of(as_of).next()), |m| Some(m.next()))
        .take(count)
        .collect()
}

/// Every month a completed payment has covered for `member_id`, due or not.
pub fn paid_months<P: SettledMonths>(member_id: i64, payments: &[P]) -> BTreeSet<YearMonth> {
    payments
        .iter()
        .filter(|p| p.member_id() == member_id && p.status() == PaymentStatus::Completed)
        .flat_map(|p| p.months().iter().copied())
        .collect()
}

/// Splits `due` into months already paid for `member_id` and months still pending.
pub fn reconcile<P: SettledMonths>(
    member_id: i64,
    due: &[YearMonth],
    payments: &[P],
) -> Reconciliation {
    let paid_any = paid_months(member_id, payments);
    let (paid, pending) = due.iter().partition(|m| paid_any.contains(*m));
    Reconciliation { paid, pending }
}

/// Total owed for `unpaid_months` months at `amount_per_month`.
#[must_use]
pub fn amount_due(amount_per_month: f64, unpaid_months: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let months = unpaid_months as f64;
    amount_per_month * months
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use chrono::TimeZone;

    struct Paid {
        member_id: i64,
        status: PaymentStatus,
        months: Vec<YearMonth>,
    }

    impl SettledMonths for Paid {
        fn member_id(&self) -> i64 {
            self.member_id
        }
        fn status(&self) -> PaymentStatus {
            self.status
        }
        fn months(&self) -> &[YearMonth] {
            &self.months
        }
    }

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(ym("2024-03").to_string(), "2024-03");
        assert_eq!(ym("2024-12").next(), ym("2025-01"));
        assert_eq!(ym("2024-01").previous(), ym("2023-12"));
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("2024-3".parse::<YearMonth>().is_err());
        assert!("March".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_due_period_spans_year_boundary_inclusive() {
        let due = due_period(at(2023, 11, 20), at(2024, 2, 1));
        let rendered: Vec<String> = due.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["2023-11", "2023-12", "2024-01", "2024-02"]);

        let first = YearMonth::of(at(2023, 11, 20));
        let last = YearMonth::of(at(2024, 2, 1));
        assert_eq!(due.len() as i64, first.months_until(last) + 1);
    }

    #[test]
    fn test_due_period_empty_before_registration() {
        assert!(due_period(at(2024, 5, 1), at(2024, 4, 30)).is_empty());
        assert_eq!(due_period(at(2024, 5, 31), at(2024, 5, 1)).len(), 1);
    }

    #[test]
    fn test_offerable_months_start_after_current() {
        let months = offerable_months(at(2024, 11, 15), ADVANCE_MONTHS);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], ym("2024-12"));
        assert_eq!(months[11], ym("2025-11"));
    }

    #[test]
    fn test_reconcile_partitions_due_months() {
        let due = due_period(at(2024, 1, 10), at(2024, 4, 10));
        let payments = vec![
            Paid {
                member_id: 1,
                status: PaymentStatus::Completed,
                months: vec![ym("2024-01"), ym("2024-03"), ym("2024-09")],
            },
            // Not completed: does not count
            Paid {
                member_id: 1,
                status: PaymentStatus::Pending,
                months: vec![ym("2024-02")],
            },
            // Another member
            Paid {
                member_id: 2,
                status: PaymentStatus::Completed,
                months: vec![ym("2024-04")],
            },
        ];

        let result = reconcile(1, &due, &payments);
        assert_eq!(result.paid, BTreeSet::from([ym("2024-01"), ym("2024-03")]));
        assert_eq!(result.pending, BTreeSet::from([ym("2024-02"), ym("2024-04")]));

        let union: BTreeSet<YearMonth> = result.paid.union(&result.pending).copied().collect();
        assert_eq!(union, due.iter().copied().collect());
        assert!(result.paid.is_disjoint(&result.pending));

        // Advance payment outside the due window is still reported as paid
        assert!(paid_months(1, &payments).contains(&ym("2024-09")));
    }

    #[test]
    fn test_amount_due() {
        assert_eq!(amount_due(10.0, 3), 30.0);
        assert_eq!(amount_due(10.0, 0), 0.0);
    }

    #[test]
    fn test_parse_months_dedups_and_orders() {
        let months = parse_months(&["2024-03", "2024-01", "2024-03"]).unwrap();
        assert_eq!(months.into_iter().collect::<Vec<_>>(), [ym("2024-01"), ym("2024-03")]);
        assert!(parse_months(&["2024-01", "bad"]).is_err());
    }
}
