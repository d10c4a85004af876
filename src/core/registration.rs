//! Registration business logic - Handles family and individual enrollments.
//!
//! A registration owns an ordered, fixed-length member list. Admin edits change
//! member fields in place; members are never inserted or removed after creation.

use crate::{
    core::sequence::{self, REGISTRATION_PREFIX},
    entities::{
        BenefitApplication, Member, Payment, Registration, benefit_application, member, payment,
        registration,
    },
    errors::{Error, Result},
    models::{RegistrationStatus, RegistrationType},
};
use chrono::{DateTime, Datelike, Utc};
use sea_orm::{
    PaginatorTrait, QueryOrder, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Contribution assumed when a member is registered without one.
pub const DEFAULT_MONTHLY_CONTRIBUTION: f64 = 10.0;

const fn default_contribution() -> f64 {
    DEFAULT_MONTHLY_CONTRIBUTION
}

/// A member as supplied at registration time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    /// Full name
    pub name: String,
    /// Contact phone
    pub phone: String,
    /// Aadhar number
    #[serde(alias = "aadhar")]
    pub aadhar_number: String,
    /// Monthly contribution, defaults to 10
    #[serde(default = "default_contribution", alias = "payingAmount")]
    pub monthly_contribution: f64,
}

/// Input for [`create_registration`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRegistration {
    /// Family id; generated as `FAM-<year>-<seq>` when absent
    #[serde(default)]
    pub registration_id: Option<String>,
    /// `"family"` or `"individual"`
    pub registration_type: String,
    /// Must equal `members.len()`
    pub number_of_members: i32,
    /// Members in display order
    pub members: Vec<NewMember>,
    /// Defaults to the creation time
    #[serde(default)]
    pub registration_date: Option<DateTime<Utc>>,
    /// Defaults to `"Active"`
    #[serde(default)]
    pub status: Option<String>,
}

/// Field edits for one existing member.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpdate {
    /// Member being edited
    pub id: i64,
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New phone
    #[serde(default)]
    pub phone: Option<String>,
    /// New aadhar number
    #[serde(default, alias = "aadhar")]
    pub aadhar_number: Option<String>,
    /// New contribution
    #[serde(default, alias = "payingAmount")]
    pub monthly_contribution: Option<f64>,
}

/// Input for [`update_registration`]. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationUpdate {
    /// New registration type
    #[serde(default)]
    pub registration_type: Option<String>,
    /// New status
    #[serde(default)]
    pub status: Option<String>,
    /// Edits to existing members
    #[serde(default)]
    pub members: Option<Vec<MemberUpdate>>,
}

/// A registration together with its members in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationRecord {
    /// The registration row
    #[serde(flatten)]
    pub registration: registration::Model,
    /// Members ordered by position
    pub members: Vec<member::Model>,
}

impl RegistrationRecord {
    fn new(registration: registration::Model, mut members: Vec<member::Model>) -> Self {
        members.sort_by_key(|m| m.position);
        Self {
            registration,
            members,
        }
    }

    /// Looks up a member of this registration by id.
    #[must_use]
    pub fn member(&self, member_id: i64) -> Option<&member::Model> {
        self.members.iter().find(|m| m.id == member_id)
    }
}

fn require_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn validate_contribution(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

/// Creates a registration and its members in one transaction.
#[instrument(skip(db, input), fields(registration_id = ?input.registration_id))]
pub async fn create_registration(
    db: &DatabaseConnection,
    input: NewRegistration,
    now: DateTime<Utc>,
) -> Result<RegistrationRecord> {
    let registration_type: RegistrationType = input.registration_type.parse()?;
    let status = input
        .status
        .as_deref()
        .map_or(Ok(RegistrationStatus::Active), str::parse::<RegistrationStatus>)?;

    if input.number_of_members < 1 {
        return Err(Error::validation("numberOfMembers must be at least 1"));
    }
    if usize::try_from(input.number_of_members).ok() != Some(input.members.len()) {
        return Err(Error::validation(format!(
            "numberOfMembers is {} but {} members were supplied",
            input.number_of_members,
            input.members.len()
        )));
    }

    let mut members = Vec::with_capacity(input.members.len());
    for m in &input.members {
        members.push((
            require_text(&m.name, "Member name")?,
            require_text(&m.phone, "Member phone")?,
            require_text(&m.aadhar_number, "Member aadhar")?,
            validate_contribution(m.monthly_contribution)?,
        ));
    }

    let txn = db.begin().await?;

    let registration_id = match input.registration_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            let key = sequence::registration_key(now.year());
            let seq = sequence::next_sequence(&txn, &key, now).await?;
            sequence::format_identifier(REGISTRATION_PREFIX, now.year(), seq)
        }
    };

    let existing = Registration::find()
        .filter(registration::Column::RegistrationId.eq(registration_id.as_str()))
        .count(&txn)
        .await?;
    if existing > 0 {
        return Err(Error::Conflict {
            message: format!("Registration id '{registration_id}' already exists"),
        });
    }

    let registration = registration::ActiveModel {
        registration_id: Set(registration_id.clone()),
        registration_type: Set(registration_type.as_str().to_string()),
        number_of_members: Set(input.number_of_members),
        registration_date: Set(input.registration_date.unwrap_or(now)),
        status: Set(status.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| {
        Error::conflict_on_unique(e, format!("Registration id '{registration_id}' already exists"))
    })?;

    let mut inserted = Vec::with_capacity(members.len());
    for (position, (name, phone, aadhar_number, monthly_contribution)) in
        members.into_iter().enumerate()
    {
        let model = member::ActiveModel {
            registration_pk: Set(registration.id),
            position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
            name: Set(name),
            phone: Set(phone),
            aadhar_number: Set(aadhar_number),
            monthly_contribution: Set(monthly_contribution),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        inserted.push(model);
    }

    txn.commit().await?;

    info!(
        "Created registration {} with {} members",
        registration.registration_id,
        inserted.len()
    );
    Ok(RegistrationRecord::new(registration, inserted))
}

async fn load_members<C>(db: &C, registration_pk: i64) -> Result<Vec<member::Model>>
where
    C: ConnectionTrait,
{
    Member::find()
        .filter(member::Column::RegistrationPk.eq(registration_pk))
        .order_by_asc(member::Column::Position)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a registration by its internal id.
pub async fn get_registration(db: &DatabaseConnection, id: i64) -> Result<RegistrationRecord> {
    let registration = Registration::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Registration", id))?;
    let members = load_members(db, registration.id).await?;
    Ok(RegistrationRecord::new(registration, members))
}

/// Lists every registration, newest first.
pub async fn list_registrations(db: &DatabaseConnection) -> Result<Vec<RegistrationRecord>> {
    let rows = Registration::find()
        .order_by_desc(registration::Column::CreatedAt)
        .order_by_desc(registration::Column::Id)
        .find_with_related(Member)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(registration, members)| RegistrationRecord::new(registration, members))
        .collect())
}

/// Finds registrations by family id: exact match first, then case-insensitive.
#[instrument(skip(db))]
pub async fn find_by_family_id(
    db: &DatabaseConnection,
    family_id: &str,
) -> Result<Vec<RegistrationRecord>> {
    let family_id = family_id.trim();
    if family_id.is_empty() {
        return Err(Error::validation("Family ID is required"));
    }

    let mut rows = Registration::find()
        .filter(registration::Column::RegistrationId.eq(family_id))
        .find_with_related(Member)
        .all(db)
        .await?;

    if rows.is_empty() {
        debug!("No exact match for {}; trying case-insensitive", family_id);
        rows = Registration::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(registration::Column::RegistrationId)))
                    .eq(family_id.to_lowercase()),
            )
            .order_by_asc(registration::Column::Id)
            .find_with_related(Member)
            .all(db)
            .await?;
    }

    if rows.is_empty() {
        return Err(Error::FamilyNotFound {
            family_id: family_id.to_string(),
        });
    }

    Ok(rows
        .into_iter()
        .map(|(registration, members)| RegistrationRecord::new(registration, members))
        .collect())
}

/// Resolves a family id to exactly one registration using the same lookup policy
/// as [`find_by_family_id`], returning the first match.
pub async fn get_family(db: &DatabaseConnection, family_id: &str) -> Result<RegistrationRecord> {
    let mut found = find_by_family_id(db, family_id).await?;
    Ok(found.remove(0))
}

/// Loads a member together with the registration it belongs to.
pub async fn get_member<C>(db: &C, member_id: i64) -> Result<(member::Model, registration::Model)>
where
    C: ConnectionTrait,
{
    let (member, registration) = Member::find_by_id(member_id)
        .find_also_related(Registration)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Member", member_id))?;
    let registration = registration.ok_or_else(|| Error::not_found("Registration", member_id))?;
    Ok((member, registration))
}

/// Loads a member and checks it belongs to the family `family_id` (exact id match).
pub async fn get_family_member<C>(
    db: &C,
    family_id: &str,
    member_id: i64,
) -> Result<(member::Model, registration::Model)>
where
    C: ConnectionTrait,
{
    let (member, registration) = get_member(db, member_id).await?;
    if registration.registration_id != family_id {
        return Err(Error::validation(format!(
            "Member {member_id} does not belong to family {family_id}"
        )));
    }
    Ok((member, registration))
}

/// Applies admin edits to a registration and its existing members.
#[instrument(skip(db, patch))]
pub async fn update_registration(
    db: &DatabaseConnection,
    id: i64,
    patch: RegistrationUpdate,
    now: DateTime<Utc>,
) -> Result<RegistrationRecord> {
    let registration_type = patch
        .registration_type
        .as_deref()
        .map(str::parse::<RegistrationType>)
        .transpose()?;
    let status = patch
        .status
        .as_deref()
        .map(str::parse::<RegistrationStatus>)
        .transpose()?;

    let txn = db.begin().await?;

    let registration = Registration::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Registration", id))?;

    let members: HashMap<i64, member::Model> = load_members(&txn, registration.id)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    for edit in patch.members.unwrap_or_default() {
        let current = members.get(&edit.id).ok_or_else(|| {
            Error::validation(format!(
                "Member {} is not part of registration {}",
                edit.id, registration.registration_id
            ))
        })?;

        let mut active: member::ActiveModel = current.clone().into();
        if let Some(name) = edit.name {
            active.name = Set(require_text(&name, "Member name")?);
        }
        if let Some(phone) = edit.phone {
            active.phone = Set(require_text(&phone, "Member phone")?);
        }
        if let Some(aadhar) = edit.aadhar_number {
            active.aadhar_number = Set(require_text(&aadhar, "Member aadhar")?);
        }
        if let Some(amount) = edit.monthly_contribution {
            active.monthly_contribution = Set(validate_contribution(amount)?);
        }
        active.update(&txn).await?;
    }

    let mut active: registration::ActiveModel = registration.into();
    if let Some(kind) = registration_type {
        active.registration_type = Set(kind.as_str().to_string());
    }
    if let Some(status) = status {
        active.status = Set(status.as_str().to_string());
    }
    active.updated_at = Set(now);
    let registration = active.update(&txn).await?;
    let members = load_members(&txn, registration.id).await?;

    txn.commit().await?;

    info!("Updated registration {}", registration.registration_id);
    Ok(RegistrationRecord::new(registration, members))
}

/// Deletes a registration and its members.
///
/// Refused while any payment or benefit application still references the family id.
#[instrument(skip(db))]
pub async fn delete_registration(db: &DatabaseConnection, id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let registration = Registration::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Registration", id))?;

    let payments = Payment::find()
        .filter(payment::Column::FamilyId.eq(registration.registration_id.as_str()))
        .count(&txn)
        .await?;
    let applications = BenefitApplication::find()
        .filter(benefit_application::Column::FamilyId.eq(registration.registration_id.as_str()))
        .count(&txn)
        .await?;
    if payments > 0 || applications > 0 {
        return Err(Error::Conflict {
            message: format!(
                "Registration {} is referenced by {payments} payments and {applications} benefit applications",
                registration.registration_id
            ),
        });
    }

    Member::delete_many()
        .filter(member::Column::RegistrationPk.eq(registration.id))
        .exec(&txn)
        .await?;
    let registration_id = registration.registration_id.clone();
    registration.delete(&txn).await?;

    txn.commit().await?;
    info!("Deleted registration {}", registration_id);
    Ok(())
}
