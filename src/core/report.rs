//! Report generation business logic.
//!
//! This module aggregates payments and benefit applications into the admin
//! dashboard, the benefit totals and the per-family contribution summary. All
//! functions are framework-agnostic and return structured data that the HTTP
//! layer serializes as-is.

use crate::{
    core::{
        benefit::{self, ApplicationRecord},
        ledger::{self, YearMonth},
        payment::{self, PaymentRecord},
        registration,
    },
    entities::Member,
    errors::Result,
    models::{ApplicationStatus, PaymentStatus},
};
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use serde::Serialize;

/// Number of months in the dashboard series.
pub const SERIES_MONTHS: usize = 6;

/// Number of approvals listed on the dashboard.
pub const RECENT_APPROVALS: usize = 5;

/// One month of the dashboard series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotals {
    /// The month
    pub month: YearMonth,
    /// Completed contributions recorded in the month
    pub collected: f64,
    /// Payouts approved in the month
    pub approved: f64,
}

/// A recently approved application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalSummary {
    /// Public application id
    pub application_id: String,
    /// Claimant name
    pub member_name: String,
    /// Benefit type label
    pub benefit_type: String,
    /// Approved payout
    pub amount: f64,
    /// Review date, else filing time
    pub approved_at: DateTime<Utc>,
}

/// Headline figures for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Registered members across all families
    pub total_members: u64,
    /// Σ amount × months over completed payments
    pub total_collected: f64,
    /// Applications still Pending or Under Review
    pub active_benefits: usize,
    /// Applications still Pending
    pub pending_approvals: usize,
    /// Σ approved amount over Approved applications
    pub approved_total: f64,
    /// `total_collected - approved_total`
    pub remaining_balance: f64,
    /// Oldest month first, ending with the current month
    pub monthly: Vec<MonthlyTotals>,
    /// Newest approvals first
    pub recent_approvals: Vec<ApprovalSummary>,
}

/// Totals over all benefit applications.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenefitStats {
    /// Σ claimed amount over all applications
    pub total_claimed: f64,
    /// Σ approved amount over Approved applications
    pub total_approved: f64,
    /// Σ claimed amount over open applications
    pub total_pending: f64,
    /// Number of applications
    pub count: usize,
}

/// A family's contribution position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilySummary {
    /// Family id summarised
    pub family_id: String,
    /// Number of members
    pub members: usize,
    /// Months due since registration, current month included
    pub total_months: usize,
    /// Σ member contribution × `total_months`
    pub expected: f64,
    /// Σ completed payment totals
    pub paid: f64,
    /// `max(0, expected - paid)`
    pub due: f64,
    /// Months listed on completed payments
    pub paid_months: usize,
}

fn completed(payments: &[PaymentRecord]) -> impl Iterator<Item = &PaymentRecord> {
    payments
        .iter()
        .filter(|p| p.payment_status() == PaymentStatus::Completed)
}

fn has_status(application: &ApplicationRecord, status: ApplicationStatus) -> bool {
    application.status == status.as_str()
}

fn is_open(application: &ApplicationRecord) -> bool {
    application
        .status
        .parse::<ApplicationStatus>()
        .is_ok_and(ApplicationStatus::is_open)
}

/// When an approval counts for the series: its review date, else filing date.
fn approved_at(application: &ApplicationRecord) -> DateTime<Utc> {
    application.review_date.unwrap_or(application.created_at)
}

/// Index of `at` in a series of `len` months ending with `current`.
///
/// Months after `current` fall into the last slot; months before the window fall out.
fn series_slot(at: DateTime<Utc>, current: YearMonth, len: usize) -> Option<usize> {
    let back = YearMonth::of(at).months_until(current).max(0);
    let back = usize::try_from(back).ok()?;
    (back < len).then(|| len - 1 - back)
}

/// Builds the dashboard series from already-loaded payments and applications.
///
/// # Arguments
/// * `payments` - All payments
/// * `applications` - All benefit applications
/// * `now` - Reference instant; its month is the last in the series
///
/// # Returns
/// `SERIES_MONTHS` entries, oldest first
#[must_use]
pub fn monthly_series(
    payments: &[PaymentRecord],
    applications: &[ApplicationRecord],
    now: DateTime<Utc>,
) -> Vec<MonthlyTotals> {
    let current = YearMonth::of(now);
    let mut first = current;
    for _ in 1..SERIES_MONTHS {
        first = first.previous();
    }

    let mut series: Vec<MonthlyTotals> =
        std::iter::successors(Some(first), |m| Some(m.next()))
            .take(SERIES_MONTHS)
            .map(|month| MonthlyTotals {
                month,
                collected: 0.0,
                approved: 0.0,
            })
            .collect();

    for record in completed(payments) {
        if let Some(slot) = series_slot(record.payment.created_at, current, SERIES_MONTHS) {
            series[slot].collected += record.total;
        }
    }
    for application in applications
        .iter()
        .filter(|a| has_status(a, ApplicationStatus::Approved))
    {
        if let Some(slot) = series_slot(approved_at(application), current, SERIES_MONTHS) {
            series[slot].approved += application.approved_amount;
        }
    }
    series
}

/// Generates the admin dashboard figures.
///
/// # Arguments
/// * `db` - Database connection
/// * `now` - Reference instant for the monthly series
///
/// # Returns
/// A structured `DashboardStats`
pub async fn dashboard_stats(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<DashboardStats> {
    let total_members = Member::find().count(db).await?;
    let payments = payment::list_payments(db).await?;
    let applications = benefit::list_applications(db, None).await?;

    let total_collected: f64 = completed(&payments).map(|p| p.total).sum();
    let approved: Vec<&ApplicationRecord> = applications
        .iter()
        .filter(|a| has_status(a, ApplicationStatus::Approved))
        .collect();
    let approved_total: f64 = approved.iter().map(|a| a.approved_amount).sum();

    let mut recent_approvals: Vec<ApprovalSummary> = approved
        .iter()
        .map(|a| ApprovalSummary {
            application_id: a.application_id.clone(),
            member_name: a.member_name.clone(),
            benefit_type: a.benefit_type.clone(),
            amount: a.approved_amount,
            approved_at: approved_at(a),
        })
        .collect();
    recent_approvals.sort_by(|a, b| b.approved_at.cmp(&a.approved_at));
    recent_approvals.truncate(RECENT_APPROVALS);

    Ok(DashboardStats {
        total_members,
        total_collected,
        active_benefits: applications.iter().filter(|a| is_open(a)).count(),
        pending_approvals: applications
            .iter()
            .filter(|a| has_status(a, ApplicationStatus::Pending))
            .count(),
        approved_total,
        remaining_balance: total_collected - approved_total,
        monthly: monthly_series(&payments, &applications, now),
        recent_approvals,
    })
}

/// Totals claimed, approved and pending over all applications.
pub async fn benefit_stats(db: &DatabaseConnection) -> Result<BenefitStats> {
    let applications = benefit::list_applications(db, None).await?;
    Ok(BenefitStats {
        total_claimed: applications.iter().map(|a| a.total_amount).sum(),
        total_approved: applications
            .iter()
            .filter(|a| has_status(a, ApplicationStatus::Approved))
            .map(|a| a.approved_amount)
            .sum(),
        total_pending: applications
            .iter()
            .filter(|a| is_open(a))
            .map(|a| a.total_amount)
            .sum(),
        count: applications.len(),
    })
}

/// Generates the contribution summary of one family.
///
/// # Arguments
/// * `db` - Database connection
/// * `family_id` - Family id, matched exactly then case-insensitively
/// * `as_of` - Reference date the due months run to
pub async fn family_summary(
    db: &DatabaseConnection,
    family_id: &str,
    as_of: DateTime<Utc>,
) -> Result<FamilySummary> {
    let family = registration::get_family(db, family_id).await?;
    let payments =
        payment::list_family_payments(db, &family.registration.registration_id).await?;

    let total_months = ledger::due_period(family.registration.registration_date, as_of).len();
    let expected: f64 = family
        .members
        .iter()
        .map(|m| ledger::amount_due(m.monthly_contribution, total_months))
        .sum();
    let paid: f64 = completed(&payments).map(|p| p.total).sum();

    Ok(FamilySummary {
        family_id: family.registration.registration_id,
        members: family.members.len(),
        total_months,
        expected,
        paid,
        due: (expected - paid).max(0.0),
        paid_months: completed(&payments).map(|p| p.months.len()).sum(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{core::benefit::StatusUpdate, test_utils::*};
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_series_slot() {
        let current: YearMonth = "2024-06".parse().unwrap();
        let at = |y, m| Utc.with_ymd_and_hms(y, m, 10, 0, 0, 0).unwrap();

        assert_eq!(series_slot(at(2024, 6), current, 6), Some(5));
        assert_eq!(series_slot(at(2024, 1), current, 6), Some(0));
        assert_eq!(series_slot(at(2023, 12), current, 6), None);
        assert_eq!(series_slot(at(2024, 8), current, 6), Some(5));
    }

    #[tokio::test]
    async fn test_dashboard_and_benefit_stats() -> Result<()> {
        let db = setup_test_db().await?;
        let family = create_test_registration(&db, "FAM001", 2).await?;
        let ids: Vec<i64> = family.members.iter().map(|m| m.id).collect();

        payment::submit_payment(
            &db,
            payment_input("FAM001", ids[0], &["2024-01", "2024-02"]),
            fixed_now(),
        )
        .await?;
        let mut pending = payment_input("FAM001", ids[1], &["2024-01"]);
        pending.status = Some("Pending".to_string());
        payment::submit_payment(&db, pending, fixed_now()).await?;

        let approved = create_test_application(&db, "FAM002").await?;
        create_test_application(&db, "FAM003").await?;
        benefit::set_status(
            &db,
            approved.id,
            StatusUpdate {
                status: "Approved".to_string(),
                reviewed_by: None,
                review_notes: None,
            },
            fixed_now(),
        )
        .await?;

        let stats = dashboard_stats(&db, fixed_now()).await?;
        assert_eq!(stats.total_members, 4);
        assert_eq!(stats.total_collected, 20.0);
        assert_eq!(stats.active_benefits, 1);
        assert_eq!(stats.pending_approvals, 1);
        assert_eq!(stats.approved_total, 12500.0);
        assert_eq!(stats.remaining_balance, 20.0 - 12500.0);
        assert_eq!(stats.monthly.len(), SERIES_MONTHS);
        assert_eq!(stats.monthly[5].month, YearMonth::of(fixed_now()));
        assert_eq!(stats.monthly[5].collected, 20.0);
        assert_eq!(stats.monthly[5].approved, 12500.0);
        assert_eq!(stats.recent_approvals.len(), 1);

        let benefits = benefit_stats(&db).await?;
        assert_eq!(benefits.count, 2);
        assert_eq!(benefits.total_claimed, 50000.0);
        assert_eq!(benefits.total_approved, 12500.0);
        assert_eq!(benefits.total_pending, 25000.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_family_summary() -> Result<()> {
        let db = setup_test_db().await?;
        let family = create_test_registration(&db, "FAM001", 2).await?;
        let first = family.members[0].id;

        payment::submit_payment(
            &db,
            payment_input("FAM001", first, &["2024-01", "2024-02"]),
            fixed_now(),
        )
        .await?;

        // Registered mid-January; three months due by March
        let as_of = fixed_now() + Duration::days(50);
        let summary = family_summary(&db, "FAM001", as_of).await?;
        assert_eq!(summary.members, 2);
        assert_eq!(summary.total_months, 3);
        assert_eq!(summary.expected, 60.0);
        assert_eq!(summary.paid, 20.0);
        assert_eq!(summary.due, 40.0);
        assert_eq!(summary.paid_months, 2);
        Ok(())
    }
}
