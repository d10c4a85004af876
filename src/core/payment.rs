//! Payment business logic - Records monthly contributions and reconciles them.
//!
//! Submissions silently drop months a completed payment already covers and are
//! rejected only when nothing is left to pay. Every check-then-insert runs in a
//! single database transaction, and the partial unique index on settled
//! `payment_months` turns any remaining double-payment race into a conflict.

use crate::{
    core::{
        ledger::{self, ADVANCE_MONTHS, Reconciliation, SettledMonths, YearMonth},
        registration,
    },
    entities::{Payment, PaymentMonth, payment, payment_month},
    errors::{Error, Result},
    models::{PaymentMethod, PaymentStatus},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

/// Input for [`submit_payment`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    /// Family id the member belongs to
    pub family_id: String,
    /// Member being paid for
    pub member_id: i64,
    /// Requested months as `YYYY-MM`
    pub months: Vec<String>,
    /// `"cash"` or `"scanner"`
    pub payment_method: String,
    /// Per-month amount; defaults to the member's contribution
    #[serde(default)]
    pub amount: Option<f64>,
    /// Defaults to `"Completed"`
    #[serde(default)]
    pub status: Option<String>,
    /// Defaults to `TXN<epoch millis>`
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Free-form notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Input for [`submit_batch`]: several members of one family, same months.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPayment {
    /// Family id all members belong to
    pub family_id: String,
    /// Members being paid for
    pub member_ids: Vec<i64>,
    /// Requested months as `YYYY-MM`
    pub months: Vec<String>,
    /// `"cash"` or `"scanner"`
    pub payment_method: String,
    /// Per-month amount; defaults to each member's contribution
    #[serde(default)]
    pub amount: Option<f64>,
    /// Defaults to `TXN<epoch millis>`, shared by the whole batch
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Free-form notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of a batch submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    /// One record per member that had something to pay
    pub records: Vec<PaymentRecord>,
    /// Sum of `amount * unpaid months` across the batch
    pub amount_due: f64,
}

/// A payment together with the months it covers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRecord {
    /// The payment row
    #[serde(flatten)]
    pub payment: payment::Model,
    /// Covered months in calendar order
    pub months: Vec<YearMonth>,
    /// `amount * months.len()`
    pub total: f64,
    #[serde(skip)]
    status: PaymentStatus,
}

impl PaymentRecord {
    fn from_parts(payment: payment::Model, month_rows: Vec<payment_month::Model>) -> Result<Self> {
        let status: PaymentStatus = payment.status.parse()?;
        let mut months = month_rows
            .iter()
            .map(|row| row.month.parse())
            .collect::<Result<Vec<YearMonth>>>()?;
        months.sort();
        let total = ledger::amount_due(payment.amount, months.len());
        Ok(Self {
            payment,
            months,
            total,
            status,
        })
    }

    /// Parsed settlement status.
    #[must_use]
    pub const fn payment_status(&self) -> PaymentStatus {
        self.status
    }
}

impl SettledMonths for PaymentRecord {
    fn member_id(&self) -> i64 {
        self.payment.member_id
    }

    fn status(&self) -> PaymentStatus {
        self.status
    }

    fn months(&self) -> &[YearMonth] {
        &self.months
    }
}

/// One member's position in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberLedger {
    /// Member id
    pub member_id: i64,
    /// Member name
    pub member_name: String,
    /// Contribution per month
    pub monthly_contribution: f64,
    /// Months from registration through the reference month
    pub due_months: Vec<YearMonth>,
    /// Paid/pending split of `due_months`
    #[serde(flatten)]
    pub reconciliation: Reconciliation,
    /// Completed months beyond the reference month
    pub paid_in_advance: BTreeSet<YearMonth>,
    /// Upcoming months still open for advance payment
    pub offerable_months: Vec<YearMonth>,
    /// `monthly_contribution * pending.len()`
    pub amount_due: f64,
}

/// The ledger of every member in a family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyLedger {
    /// Family id
    pub family_id: String,
    /// Reference date the due months run to
    pub as_of: DateTime<Utc>,
    /// Per-member breakdown in member order
    pub members: Vec<MemberLedger>,
    /// Sum of every member's `amount_due`
    pub total_due: f64,
}

fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

fn default_transaction_id(now: DateTime<Utc>) -> String {
    format!("TXN{}", now.timestamp_millis())
}

fn requested_months(tokens: &[String]) -> Result<BTreeSet<YearMonth>> {
    let months = ledger::parse_months(tokens)?;
    if months.is_empty() {
        return Err(Error::validation("Select at least one month"));
    }
    Ok(months)
}

async fn member_payments<C>(db: &C, member_id: i64) -> Result<Vec<PaymentRecord>>
where
    C: ConnectionTrait,
{
    Payment::find()
        .filter(payment::Column::MemberId.eq(member_id))
        .find_with_related(PaymentMonth)
        .all(db)
        .await?
        .into_iter()
        .map(|(payment, months)| PaymentRecord::from_parts(payment, months))
        .collect()
}

struct PaymentDraft<'a> {
    family_id: &'a str,
    member_id: i64,
    amount: Option<f64>,
    method: PaymentMethod,
    status: PaymentStatus,
    transaction_id: &'a str,
    notes: Option<String>,
}

/// Writes one payment for the unpaid subset of `requested`. Returns `None` when
/// every requested month is already paid.
async fn record_payment<C>(
    db: &C,
    draft: PaymentDraft<'_>,
    requested: &BTreeSet<YearMonth>,
    now: DateTime<Utc>,
) -> Result<Option<PaymentRecord>>
where
    C: ConnectionTrait,
{
    let (member, _) = registration::get_family_member(db, draft.family_id, draft.member_id).await?;
    let amount = validate_amount(draft.amount.unwrap_or(member.monthly_contribution))?;

    let existing = member_payments(db, member.id).await?;
    let already_paid = ledger::paid_months(member.id, &existing);
    let unpaid: Vec<YearMonth> = requested.difference(&already_paid).copied().collect();
    if unpaid.is_empty() {
        debug!("Member {} has nothing left to pay", member.id);
        return Ok(None);
    }

    let payment = payment::ActiveModel {
        family_id: Set(draft.family_id.to_string()),
        member_id: Set(member.id),
        member_name: Set(member.name.clone()),
        amount: Set(amount),
        payment_method: Set(draft.method.as_str().to_string()),
        status: Set(draft.status.as_str().to_string()),
        transaction_id: Set(draft.transaction_id.to_string()),
        notes: Set(draft.notes),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let settled = draft.status == PaymentStatus::Completed;
    let rows = unpaid.iter().map(|month| payment_month::ActiveModel {
        payment_id: Set(payment.id),
        member_id: Set(member.id),
        month: Set(month.to_string()),
        settled: Set(settled),
        ..Default::default()
    });
    PaymentMonth::insert_many(rows)
        .exec(db)
        .await
        .map_err(|e| {
            Error::conflict_on_unique(
                e,
                format!("A selected month is already paid for member {}", member.id),
            )
        })?;

    let month_rows = PaymentMonth::find()
        .filter(payment_month::Column::PaymentId.eq(payment.id))
        .all(db)
        .await?;
    PaymentRecord::from_parts(payment, month_rows).map(Some)
}

/// Records a payment for one member, paying only the months not already paid.
#[instrument(skip(db, input), fields(family_id = %input.family_id, member_id = input.member_id))]
pub async fn submit_payment(
    db: &DatabaseConnection,
    input: NewPayment,
    now: DateTime<Utc>,
) -> Result<PaymentRecord> {
    let method: PaymentMethod = input.payment_method.parse()?;
    let status = input
        .status
        .as_deref()
        .map_or(Ok(PaymentStatus::Completed), str::parse::<PaymentStatus>)?;
    let requested = requested_months(&input.months)?;
    let transaction_id = input
        .transaction_id
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| default_transaction_id(now));

    let txn = db.begin().await?;
    let draft = PaymentDraft {
        family_id: &input.family_id,
        member_id: input.member_id,
        amount: input.amount,
        method,
        status,
        transaction_id: &transaction_id,
        notes: input.notes,
    };
    let record = record_payment(&txn, draft, &requested, now)
        .await?
        .ok_or(Error::NothingToPay {
            member_id: input.member_id,
        })?;
    txn.commit().await?;

    info!(
        "Recorded payment {} for member {} covering {} months",
        record.payment.id,
        record.payment.member_id,
        record.months.len()
    );
    Ok(record)
}

/// Records payments for several members at once, all-or-nothing.
///
/// Members with nothing left to pay are skipped; the batch fails with
/// [`Error::NothingToPay`] only if no member has anything to pay.
#[instrument(skip(db, input), fields(family_id = %input.family_id, members = input.member_ids.len()))]
pub async fn submit_batch(
    db: &DatabaseConnection,
    input: BatchPayment,
    now: DateTime<Utc>,
) -> Result<BatchOutcome> {
    let method: PaymentMethod = input.payment_method.parse()?;
    let requested = requested_months(&input.months)?;
    if input.member_ids.is_empty() {
        return Err(Error::validation("Select at least one member"));
    }
    let transaction_id = input
        .transaction_id
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| default_transaction_id(now));

    let member_ids: BTreeSet<i64> = input.member_ids.iter().copied().collect();

    let txn = db.begin().await?;
    let mut records = Vec::new();
    for member_id in member_ids {
        let draft = PaymentDraft {
            family_id: &input.family_id,
            member_id,
            amount: input.amount,
            method,
            status: PaymentStatus::Completed,
            transaction_id: &transaction_id,
            notes: input.notes.clone(),
        };
        if let Some(record) = record_payment(&txn, draft, &requested, now).await? {
            records.push(record);
        }
    }

    if records.is_empty() {
        return Err(Error::NothingToPay { member_id: 0 });
    }
    txn.commit().await?;

    let amount_due = records.iter().map(|r| r.total).sum();
    info!(
        "Recorded batch of {} payments totalling {:.2}",
        records.len(),
        amount_due
    );
    Ok(BatchOutcome {
        records,
        amount_due,
    })
}

/// Lists all payments, newest first.
pub async fn list_payments(db: &DatabaseConnection) -> Result<Vec<PaymentRecord>> {
    Payment::find()
        .order_by_desc(payment::Column::CreatedAt)
        .order_by_desc(payment::Column::Id)
        .find_with_related(PaymentMonth)
        .all(db)
        .await?
        .into_iter()
        .map(|(payment, months)| PaymentRecord::from_parts(payment, months))
        .collect()
}

/// Lists a family's payments, newest first.
pub async fn list_family_payments(
    db: &DatabaseConnection,
    family_id: &str,
) -> Result<Vec<PaymentRecord>> {
    Payment::find()
        .filter(payment::Column::FamilyId.eq(family_id))
        .order_by_desc(payment::Column::CreatedAt)
        .order_by_desc(payment::Column::Id)
        .find_with_related(PaymentMonth)
        .all(db)
        .await?
        .into_iter()
        .map(|(payment, months)| PaymentRecord::from_parts(payment, months))
        .collect()
}

/// Retrieves a payment by id.
pub async fn get_payment(db: &DatabaseConnection, id: i64) -> Result<PaymentRecord> {
    let payment = Payment::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Payment", id))?;
    let months = PaymentMonth::find()
        .filter(payment_month::Column::PaymentId.eq(id))
        .all(db)
        .await?;
    PaymentRecord::from_parts(payment, months)
}

/// Changes a payment's status, settling or unsettling its months to match.
#[instrument(skip(db))]
pub async fn update_payment_status(
    db: &DatabaseConnection,
    id: i64,
    status: &str,
    now: DateTime<Utc>,
) -> Result<PaymentRecord> {
    use sea_orm::sea_query::Expr;

    let status: PaymentStatus = status.parse()?;
    let txn = db.begin().await?;

    let payment = Payment::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Payment", id))?;

    let mut active: payment::ActiveModel = payment.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(now);
    let payment = active.update(&txn).await?;

    PaymentMonth::update_many()
        .col_expr(
            payment_month::Column::Settled,
            Expr::value(status == PaymentStatus::Completed),
        )
        .filter(payment_month::Column::PaymentId.eq(id))
        .exec(&txn)
        .await
        .map_err(|e| {
            Error::conflict_on_unique(
                e,
                format!("Payment {id} covers a month already paid by another completed payment"),
            )
        })?;

    let months = PaymentMonth::find()
        .filter(payment_month::Column::PaymentId.eq(id))
        .all(&txn)
        .await?;
    txn.commit().await?;

    info!("Payment {} is now {}", id, status);
    PaymentRecord::from_parts(payment, months)
}

/// Deletes a payment and its months.
#[instrument(skip(db))]
pub async fn delete_payment(db: &DatabaseConnection, id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let payment = Payment::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Payment", id))?;

    PaymentMonth::delete_many()
        .filter(payment_month::Column::PaymentId.eq(id))
        .exec(&txn)
        .await?;
    payment.delete(&txn).await?;

    txn.commit().await?;
    info!("Deleted payment {}", id);
    Ok(())
}

/// Builds the paid/pending ledger of every member in a family as of `as_of`.
pub async fn family_ledger(
    db: &DatabaseConnection,
    family_id: &str,
    as_of: DateTime<Utc>,
) -> Result<FamilyLedger> {
    let family = registration::get_family(db, family_id).await?;
    let payments = list_family_payments(db, &family.registration.registration_id).await?;
    let current = YearMonth::of(as_of);

    let members: Vec<MemberLedger> = family
        .members
        .iter()
        .map(|member| {
            let due_months = ledger::due_period(family.registration.registration_date, as_of);
            let reconciliation = ledger::reconcile(member.id, &due_months, &payments);
            let paid_in_advance: BTreeSet<YearMonth> = ledger::paid_months(member.id, &payments)
                .into_iter()
                .filter(|m| *m > current)
                .collect();
            let offerable_months = ledger::offerable_months(as_of, ADVANCE_MONTHS)
                .into_iter()
                .filter(|m| !paid_in_advance.contains(m))
                .collect();
            let amount_due =
                ledger::amount_due(member.monthly_contribution, reconciliation.pending.len());
            MemberLedger {
                member_id: member.id,
                member_name: member.name.clone(),
                monthly_contribution: member.monthly_contribution,
                due_months,
                reconciliation,
                paid_in_advance,
                offerable_months,
                amount_due,
            }
        })
        .collect();

    let total_due = members.iter().map(|m| m.amount_due).sum();
    Ok(FamilyLedger {
        family_id: family.registration.registration_id,
        as_of,
        members,
        total_due,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use chrono::{Duration, TimeZone};
    use sea_orm::{DatabaseBackend, MockDatabase, PaginatorTrait};

    fn months(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(ToString::to_string).collect()
    }

    fn rendered(record: &PaymentRecord) -> Vec<String> {
        record.months.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_submit_payment_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let mut input = payment_input("FAM001", 1, &["2024-01"]);
        input.payment_method = "card".to_string();
        let result = submit_payment(&db, input, fixed_now()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let input = payment_input("FAM001", 1, &["January"]);
        let result = submit_payment(&db, input, fixed_now()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let input = payment_input("FAM001", 1, &[]);
        let result = submit_payment(&db, input, fixed_now()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_submit_payment_defaults() -> Result<()> {
        let db = setup_test_db().await?;
        let family = create_test_registration(&db, "FAM001", 1).await?;
        let member_id = family.members[0].id;

        let record = submit_payment(
            &db,
            payment_input("FAM001", member_id, &["2024-02", "2024-01"]),
            fixed_now(),
        )
        .await?;

        assert_eq!(rendered(&record), ["2024-01", "2024-02"]);
        assert_eq!(record.payment.status, "Completed");
        assert_eq!(record.payment.amount, 10.0);
        assert_eq!(record.total, 20.0);
        assert_eq!(record.payment.member_name, "Member 1");
        assert_eq!(
            record.payment.transaction_id,
            format!("TXN{}", fixed_now().timestamp_millis())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_payment_pays_only_unpaid_subset() -> Result<()> {
        let db = setup_test_db().await?;
        let family = create_test_registration(&db, "FAM001", 1).await?;
        let member_id = family.members[0].id;

        submit_payment(&db, payment_input("FAM001", member_id, &["2024-01"]), fixed_now()).await?;
        let second = submit_payment(
            &db,
            payment_input("FAM001", member_id, &["2024-01", "2024-02"]),
            fixed_now(),
        )
        .await?;

        assert_eq!(rendered(&second), ["2024-02"]);
        assert_eq!(second.total, 10.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_payment_nothing_to_pay_creates_no_record() -> Result<()> {
        let db = setup_test_db().await?;
        let family = create_test_registration(&db, "FAM001", 1).await?;
        let member_id = family.members[0].id;

        submit_payment(
            &db,
            payment_input("FAM001", member_id, &["2024-01", "2024-02"]),
            fixed_now(),
        )
        .await?;
        let before = Payment::find().count(&db).await?;

        let result = submit_payment(
            &db,
            payment_input("FAM001", member_id, &["2024-02", "2024-01"]),
            fixed_now(),
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NothingToPay { member_id: id } if id == member_id
        ));
        assert_eq!(Payment::find().count(&db).await?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_pending_payment_does_not_block_months() -> Result<()> {
        let db = setup_test_db().await?;
        let family = create_test_registration(&db, "FAM001", 1).await?;
        let member_id = family.members[0].id;

        let mut pending = payment_input("FAM001", member_id, &["2024-01"]);
        pending.status = Some("Pending".to_string());
        let pending = submit_payment(&db, pending, fixed_now()).await?;
        assert_eq!(pending.payment.status, "Pending");

        let completed =
            submit_payment(&db, payment_input("FAM001", member_id, &["2024-01"]), fixed_now())
                .await?;
        assert_eq!(rendered(&completed), ["2024-01"]);

        // Settling the pending one would double-pay January
        let result = update_payment_status(&db, pending.payment.id, "Completed", fixed_now()).await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_member_must_belong_to_family() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_registration(&db, "FAM001", 1).await?;
        let other = create_test_registration(&db, "FAM002", 1).await?;

        let result = submit_payment(
            &db,
            payment_input("FAM001", other.members[0].id, &["2024-01"]),
            fixed_now(),
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_batch_skips_paid_members_and_sums_due() -> Result<()> {
        let db = setup_test_db().await?;
        let family = create_test_registration(&db, "FAM001", 3).await?;
        let ids: Vec<i64> = family.members.iter().map(|m| m.id).collect();

        // First member already paid both months
        submit_payment(
            &db,
            payment_input("FAM001", ids[0], &["2024-01", "2024-02"]),
            fixed_now(),
        )
        .await?;
        // Second member paid one of them
        submit_payment(&db, payment_input("FAM001", ids[1], &["2024-01"]), fixed_now()).await?;

        let outcome = submit_batch(
            &db,
            BatchPayment {
                family_id: "FAM001".to_string(),
                member_ids: ids.clone(),
                months: months(&["2024-01", "2024-02"]),
                payment_method: "scanner".to_string(),
                amount: None,
                transaction_id: None,
                notes: None,
            },
            fixed_now(),
        )
        .await?;

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.amount_due, 30.0);
        assert_eq!(outcome.records[0].payment.member_id, ids[1]);
        assert_eq!(rendered(&outcome.records[0]), ["2024-02"]);
        assert_eq!(rendered(&outcome.records[1]), ["2024-01", "2024-02"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_batch_nothing_to_pay() -> Result<()> {
        let db = setup_test_db().await?;
        let family = create_test_registration(&db, "FAM001", 1).await?;
        let member_id = family.members[0].id;
        submit_payment(&db, payment_input("FAM001", member_id, &["2024-01"]), fixed_now()).await?;

        let batch = BatchPayment {
            family_id: "FAM001".to_string(),
            member_ids: vec![member_id],
            months: months(&["2024-01"]),
            payment_method: "cash".to_string(),
            amount: None,
            transaction_id: None,
            notes: None,
        };
        let result = submit_batch(&db, batch, fixed_now()).await;
        assert!(matches!(result.unwrap_err(), Error::NothingToPay { .. }));
        assert_eq!(Payment::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_batch_is_atomic() -> Result<()> {
        let db = setup_test_db().await?;
        let family = create_test_registration(&db, "FAM001", 1).await?;
        let stranger = create_test_registration(&db, "FAM002", 1).await?;

        let batch = BatchPayment {
            family_id: "FAM001".to_string(),
            member_ids: vec![family.members[0].id, stranger.members[0].id],
            months: months(&["2024-01"]),
            payment_method: "cash".to_string(),
            amount: None,
            transaction_id: None,
            notes: None,
        };
        let result = submit_batch(&db, batch, fixed_now()).await;
        assert!(result.is_err());
        assert_eq!(Payment::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_status_and_delete() -> Result<()> {
        let db = setup_test_db().await?;
        let family = create_test_registration(&db, "FAM001", 1).await?;
        let member_id = family.members[0].id;
        let record =
            submit_payment(&db, payment_input("FAM001", member_id, &["2024-01"]), fixed_now())
                .await?;

        let failed = update_payment_status(&db, record.payment.id, "Failed", fixed_now()).await?;
        assert_eq!(failed.payment_status(), PaymentStatus::Failed);

        // January is open again once the only payment failed
        let again =
            submit_payment(&db, payment_input("FAM001", member_id, &["2024-01"]), fixed_now())
                .await?;
        assert_eq!(rendered(&again), ["2024-01"]);

        let result = update_payment_status(&db, record.payment.id, "Refunded", fixed_now()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        delete_payment(&db, record.payment.id).await?;
        let result = get_payment(&db, record.payment.id).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));
        let result = delete_payment(&db, record.payment.id).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_family_ledger() -> Result<()> {
        let db = setup_test_db().await?;
        let family = create_test_registration(&db, "FAM001", 2).await?;
        let first = family.members[0].id;

        // Registered 2024-01-15; paid January plus an advance month
        submit_payment(
            &db,
            payment_input("FAM001", first, &["2024-01", "2024-05"]),
            fixed_now(),
        )
        .await?;

        let as_of = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let ledger = family_ledger(&db, "fam001", as_of).await?;
        assert_eq!(ledger.family_id, "FAM001");
        assert_eq!(ledger.members.len(), 2);

        let m1 = &ledger.members[0];
        assert_eq!(m1.due_months.len(), 3);
        assert_eq!(m1.reconciliation.paid.len(), 1);
        assert_eq!(m1.reconciliation.pending.len(), 2);
        assert_eq!(m1.amount_due, 20.0);
        assert_eq!(m1.paid_in_advance.len(), 1);
        assert_eq!(m1.offerable_months.len(), ADVANCE_MONTHS - 1);

        let m2 = &ledger.members[1];
        assert_eq!(m2.reconciliation.pending.len(), 3);
        assert_eq!(m2.amount_due, 30.0);
        assert_eq!(ledger.total_due, 50.0);

        // Lists are newest first
        submit_payment(
            &db,
            payment_input("FAM001", first, &["2024-02"]),
            fixed_now() + Duration::days(1),
        )
        .await?;
        let listed = list_family_payments(&db, "FAM001").await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(rendered(&listed[0]), ["2024-02"]);
        Ok(())
    }
}
