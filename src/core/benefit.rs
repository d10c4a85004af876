//! Benefit application business logic - Filing, review and tracking of claims.
//!
//! Filing re-checks eligibility against the server clock, snapshots the
//! claimant, allocates the public `BEN-<year>-<seq>` id and writes the first
//! history entry in one transaction. Review moves an application between
//! statuses and appends history only when the status actually changes.

use crate::{
    core::{
        documents::StoredDocument,
        eligibility::{self, Eligibility},
        form::{Address, ApplicationForm},
        registration,
        sequence::{self, application_key, format_application_id},
    },
    entities::{
        BenefitApplication, BenefitDocument, StatusChange, benefit_application, benefit_document,
        status_change,
    },
    errors::{Error, Result},
    models::ApplicationStatus,
};
use chrono::{DateTime, Datelike, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Reviewer recorded on filing.
pub const SYSTEM_REVIEWER: &str = "System";

/// Reviewer recorded when a status change names none.
pub const DEFAULT_REVIEWER: &str = "Admin";

/// Note recorded on filing.
pub const SUBMITTED_NOTE: &str = "Application submitted";

/// Share of the claimed amount paid out on approval.
pub const PAYOUT_RATIO: f64 = 0.5;

/// Payout for a claim of `total_amount`, rounded to the nearest unit.
#[must_use]
pub fn payout(total_amount: f64) -> f64 {
    (total_amount * PAYOUT_RATIO).round()
}

/// Input for [`set_status`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// Target status label, e.g. `"Under Review"`
    pub status: String,
    /// Defaults to `"Admin"`
    #[serde(default)]
    pub reviewed_by: Option<String>,
    /// Keeps the previous notes when absent
    #[serde(default)]
    pub review_notes: Option<String>,
}

/// An application with its address, documents and history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    /// Internal primary key
    pub id: i64,
    /// Public `BEN-<year>-<seq>` id
    pub application_id: String,
    /// Family id of the claimant
    pub family_id: String,
    /// Claimant member
    pub member_id: i64,
    /// Claimant name at filing time
    pub member_name: String,
    /// Claimant aadhar at filing time
    pub member_aadhar: String,
    /// Claimant phone at filing time
    pub member_phone: String,
    /// Benefit type label
    pub benefit_type: String,
    /// Short reason for the claim
    pub reason: String,
    /// Longer description
    pub description: String,
    /// Place the expense was incurred
    pub place: String,
    /// Claimant address
    pub address: Address,
    /// Amount claimed
    pub total_amount: f64,
    /// Payout, set on approval
    pub approved_amount: f64,
    /// Current status label
    pub status: String,
    /// Last reviewer
    pub reviewed_by: Option<String>,
    /// When the last review happened
    pub review_date: Option<DateTime<Utc>>,
    /// Latest non-blank review notes
    pub review_notes: Option<String>,
    /// Uploaded supporting documents
    pub documents: Vec<benefit_document::Model>,
    /// Status changes, oldest first
    pub status_history: Vec<status_change::Model>,
    /// Filing time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl ApplicationRecord {
    fn assemble(
        model: benefit_application::Model,
        documents: Vec<benefit_document::Model>,
        mut status_history: Vec<status_change::Model>,
    ) -> Self {
        status_history.sort_by_key(|entry| (entry.changed_at, entry.id));
        Self {
            id: model.id,
            application_id: model.application_id,
            family_id: model.family_id,
            member_id: model.member_id,
            member_name: model.member_name,
            member_aadhar: model.member_aadhar,
            member_phone: model.member_phone,
            benefit_type: model.benefit_type,
            reason: model.reason,
            description: model.description,
            place: model.place,
            address: Address {
                street: model.address_street,
                city: model.address_city,
                district: model.address_district,
                state: model.address_state,
                pincode: model.address_pincode,
                country: model.address_country,
            },
            total_amount: model.total_amount,
            approved_amount: model.approved_amount,
            status: model.status,
            reviewed_by: model.reviewed_by,
            review_date: model.review_date,
            review_notes: model.review_notes,
            documents,
            status_history,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Printable summary handed to the claimant after filing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgment {
    /// Public application id
    pub application_id: String,
    /// Claimant name at filing time
    pub applicant_name: String,
    /// Family id of the claimant
    pub family_id: String,
    /// Benefit type label
    pub benefit_type: String,
    /// Place the expense was incurred
    pub place: String,
    /// Claimant address
    pub address: Address,
    /// Filing time
    pub application_date: DateTime<Utc>,
    /// Current status label
    pub status: String,
    /// Amount claimed
    pub total_amount: f64,
    /// Payout approved so far
    pub approved_amount: f64,
    /// Payout the claim qualifies for
    pub eligible_amount: f64,
}

impl From<ApplicationRecord> for Acknowledgment {
    fn from(record: ApplicationRecord) -> Self {
        Self {
            eligible_amount: payout(record.total_amount),
            application_id: record.application_id,
            applicant_name: record.member_name,
            family_id: record.family_id,
            benefit_type: record.benefit_type,
            place: record.place,
            address: record.address,
            application_date: record.created_at,
            status: record.status,
            total_amount: record.total_amount,
            approved_amount: record.approved_amount,
        }
    }
}

/// Eligibility of one member, for the pre-filing check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberEligibility {
    /// Member checked
    pub member_id: i64,
    /// Family the member belongs to
    pub family_id: String,
    /// Start of the membership window
    pub registration_date: DateTime<Utc>,
    /// Outcome of the check
    #[serde(flatten)]
    pub eligibility: Eligibility,
}

/// Eligibility of a member as of `as_of`.
pub async fn member_eligibility(
    db: &DatabaseConnection,
    member_id: i64,
    as_of: DateTime<Utc>,
) -> Result<MemberEligibility> {
    let (member, registration) = registration::get_member(db, member_id).await?;
    Ok(MemberEligibility {
        member_id: member.id,
        family_id: registration.registration_id,
        registration_date: registration.registration_date,
        eligibility: eligibility::check_eligibility(registration.registration_date, as_of),
    })
}

async fn with_details<C>(
    db: &C,
    models: Vec<benefit_application::Model>,
) -> Result<Vec<ApplicationRecord>>
where
    C: ConnectionTrait,
{
    let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut documents: HashMap<i64, Vec<benefit_document::Model>> = HashMap::new();
    for doc in BenefitDocument::find()
        .filter(benefit_document::Column::ApplicationPk.is_in(ids.clone()))
        .order_by_asc(benefit_document::Column::Id)
        .all(db)
        .await?
    {
        documents.entry(doc.application_pk).or_default().push(doc);
    }

    let mut history: HashMap<i64, Vec<status_change::Model>> = HashMap::new();
    for entry in StatusChange::find()
        .filter(status_change::Column::ApplicationPk.is_in(ids))
        .all(db)
        .await?
    {
        history.entry(entry.application_pk).or_default().push(entry);
    }

    Ok(models
        .into_iter()
        .map(|model| {
            let docs = documents.remove(&model.id).unwrap_or_default();
            let entries = history.remove(&model.id).unwrap_or_default();
            ApplicationRecord::assemble(model, docs, entries)
        })
        .collect())
}

async fn load_record<C>(db: &C, model: benefit_application::Model) -> Result<ApplicationRecord>
where
    C: ConnectionTrait,
{
    let id = model.id;
    with_details(db, vec![model])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("Application", id))
}

async fn history_entry<C>(
    db: &C,
    application_pk: i64,
    status: ApplicationStatus,
    changed_by: &str,
    notes: &str,
    now: DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    status_change::ActiveModel {
        application_pk: Set(application_pk),
        status: Set(status.as_str().to_string()),
        changed_by: Set(changed_by.to_string()),
        changed_at: Set(now),
        notes: Set(notes.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Files a benefit claim for an eligible member.
#[instrument(skip(db, form, documents), fields(family_id = %form.family_id, member_id = form.member_id))]
pub async fn create_application(
    db: &DatabaseConnection,
    form: ApplicationForm,
    documents: Vec<StoredDocument>,
    now: DateTime<Utc>,
) -> Result<ApplicationRecord> {
    let txn = db.begin().await?;

    let (member, registration) =
        registration::get_family_member(&txn, &form.family_id, form.member_id).await?;

    let check = eligibility::check_eligibility(registration.registration_date, now);
    if !check.eligible {
        debug!(
            "Member {} not eligible: {} days remaining",
            member.id, check.days_remaining
        );
        return Err(Error::NotEligible {
            days_elapsed: check.days_elapsed,
            days_remaining: check.days_remaining,
        });
    }

    let seq = sequence::next_sequence(&txn, &application_key(now.year()), now).await?;
    let application_id = format_application_id(now.year(), seq);

    let address = form.address;
    let model = benefit_application::ActiveModel {
        application_id: Set(application_id.clone()),
        family_id: Set(registration.registration_id.clone()),
        member_id: Set(member.id),
        member_name: Set(member.name),
        member_aadhar: Set(member.aadhar_number),
        member_phone: Set(member.phone),
        benefit_type: Set(form.benefit_type.as_str().to_string()),
        reason: Set(form.reason),
        description: Set(form.description),
        place: Set(form.place),
        address_street: Set(address.street),
        address_city: Set(address.city),
        address_district: Set(address.district),
        address_state: Set(address.state),
        address_pincode: Set(address.pincode),
        address_country: Set(address.country),
        total_amount: Set(form.total_amount),
        approved_amount: Set(0.0),
        status: Set(ApplicationStatus::Pending.as_str().to_string()),
        reviewed_by: Set(Some(SYSTEM_REVIEWER.to_string())),
        review_date: Set(None),
        review_notes: Set(Some(SUBMITTED_NOTE.to_string())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| {
        Error::conflict_on_unique(e, format!("Application id {application_id} already exists"))
    })?;

    for doc in documents {
        benefit_document::ActiveModel {
            application_pk: Set(model.id),
            filename: Set(doc.filename),
            original_name: Set(doc.original_name),
            storage_path: Set(doc.storage_path),
            mime_type: Set(doc.mime_type),
            size_bytes: Set(doc.size_bytes),
            document_type: Set(doc.kind.as_str().to_string()),
            uploaded_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    history_entry(
        &txn,
        model.id,
        ApplicationStatus::Pending,
        SYSTEM_REVIEWER,
        SUBMITTED_NOTE,
        now,
    )
    .await?;

    let record = load_record(&txn, model).await?;
    txn.commit().await?;

    info!(
        "Filed application {} for member {} ({})",
        record.application_id, record.member_id, record.benefit_type
    );
    Ok(record)
}

/// Moves an application to a new status.
///
/// Re-applying the current status refreshes the review fields without adding
/// history. Approval sets `approved_amount` to half the claim.
#[instrument(skip(db, update), fields(status = %update.status))]
pub async fn set_status(
    db: &DatabaseConnection,
    id: i64,
    update: StatusUpdate,
    now: DateTime<Utc>,
) -> Result<ApplicationRecord> {
    let status: ApplicationStatus = update.status.parse()?;
    let reviewer = update
        .reviewed_by
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REVIEWER.to_string());

    let txn = db.begin().await?;
    let existing = BenefitApplication::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Application", id))?;

    let changed = existing.status != status.as_str();
    let notes = update.review_notes.filter(|n| !n.trim().is_empty());
    let history_note = notes
        .clone()
        .unwrap_or_else(|| format!("Status changed to {status}"));
    let total_amount = existing.total_amount;

    let mut active: benefit_application::ActiveModel = existing.into();
    active.status = Set(status.as_str().to_string());
    active.reviewed_by = Set(Some(reviewer.clone()));
    active.review_date = Set(Some(now));
    if let Some(notes) = notes {
        active.review_notes = Set(Some(notes));
    }
    if status == ApplicationStatus::Approved {
        active.approved_amount = Set(payout(total_amount));
    }
    active.updated_at = Set(now);
    let model = active.update(&txn).await?;

    if changed {
        history_entry(&txn, model.id, status, &reviewer, &history_note, now).await?;
    }

    let record = load_record(&txn, model).await?;
    txn.commit().await?;

    info!(
        "Application {} is now {} (by {})",
        record.application_id, record.status, reviewer
    );
    Ok(record)
}

/// Retrieves an application by internal id.
pub async fn get_application(db: &DatabaseConnection, id: i64) -> Result<ApplicationRecord> {
    let model = BenefitApplication::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Application", id))?;
    load_record(db, model).await
}

/// Retrieves an application by its public `BEN-...` id.
pub async fn track_application(
    db: &DatabaseConnection,
    application_id: &str,
) -> Result<ApplicationRecord> {
    let model = BenefitApplication::find()
        .filter(benefit_application::Column::ApplicationId.eq(application_id.trim()))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Application", application_id))?;
    load_record(db, model).await
}

/// Lists applications newest first, optionally only those in one status.
pub async fn list_applications(
    db: &DatabaseConnection,
    status: Option<&str>,
) -> Result<Vec<ApplicationRecord>> {
    let mut query = BenefitApplication::find();
    if let Some(status) = status.filter(|s| !s.is_empty()) {
        let status: ApplicationStatus = status.parse()?;
        query = query.filter(benefit_application::Column::Status.eq(status.as_str()));
    }
    let models = query
        .order_by_desc(benefit_application::Column::CreatedAt)
        .order_by_desc(benefit_application::Column::Id)
        .all(db)
        .await?;
    with_details(db, models).await
}

/// Lists a family's applications newest first.
pub async fn list_family_applications(
    db: &DatabaseConnection,
    family_id: &str,
) -> Result<Vec<ApplicationRecord>> {
    let models = BenefitApplication::find()
        .filter(benefit_application::Column::FamilyId.eq(family_id))
        .order_by_desc(benefit_application::Column::CreatedAt)
        .order_by_desc(benefit_application::Column::Id)
        .all(db)
        .await?;
    with_details(db, models).await
}

/// Acknowledgment for the application with public id `application_id`.
pub async fn acknowledgment(
    db: &DatabaseConnection,
    application_id: &str,
) -> Result<Acknowledgment> {
    track_application(db, application_id).await.map(Acknowledgment::from)
}
