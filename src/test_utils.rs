//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating registrations, payments and applications with sensible defaults.

use crate::{
    core::{
        benefit::{self, ApplicationRecord},
        form::{Address, ApplicationForm},
        payment::NewPayment,
        registration::{self, NewMember, NewRegistration, RegistrationRecord},
    },
    errors::Result,
    models::BenefitType,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// The instant every fixture treats as "now": 2024-01-15 10:00 UTC.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Registration input with `members` members.
///
/// # Defaults
/// * names: "Member 1", "Member 2", ...
/// * `monthly_contribution`: 10.0
/// * `registration_type`: "family"
/// * `registration_date`: None (creation time)
#[must_use]
pub fn family_input(registration_id: &str, members: usize) -> NewRegistration {
    NewRegistration {
        registration_id: Some(registration_id.to_string()),
        registration_type: "family".to_string(),
        number_of_members: i32::try_from(members).unwrap_or(i32::MAX),
        members: (1..=members)
            .map(|i| NewMember {
                name: format!("Member {i}"),
                phone: format!("98765432{i:02}"),
                aadhar_number: format!("1234 5678 90{i:02}"),
                monthly_contribution: 10.0,
            })
            .collect(),
        registration_date: None,
        status: None,
    }
}

/// Creates a registration dated [`fixed_now`].
pub async fn create_test_registration(
    db: &DatabaseConnection,
    registration_id: &str,
    members: usize,
) -> Result<RegistrationRecord> {
    registration::create_registration(db, family_input(registration_id, members), fixed_now())
        .await
}

/// Creates a one-member registration old enough to file claims at [`fixed_now`].
pub async fn create_eligible_registration(
    db: &DatabaseConnection,
    registration_id: &str,
) -> Result<RegistrationRecord> {
    let mut input = family_input(registration_id, 1);
    input.registration_date = Some(fixed_now() - Duration::days(400));
    registration::create_registration(db, input, fixed_now()).await
}

/// Payment input for `months`, cash, default amount and status.
#[must_use]
pub fn payment_input(family_id: &str, member_id: i64, months: &[&str]) -> NewPayment {
    NewPayment {
        family_id: family_id.to_string(),
        member_id,
        months: months.iter().map(ToString::to_string).collect(),
        payment_method: "cash".to_string(),
        amount: None,
        status: None,
        transaction_id: None,
        notes: None,
    }
}

/// A medical claim of 25000 for `member_id`.
#[must_use]
pub fn application_form(family_id: &str, member_id: i64) -> ApplicationForm {
    ApplicationForm {
        family_id: family_id.to_string(),
        member_id,
        benefit_type: BenefitType::MedicalEmergency,
        reason: "Hospitalisation".to_string(),
        description: "Knee surgery".to_string(),
        place: "Pune".to_string(),
        address: Address {
            street: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            district: String::new(),
            state: "Maharashtra".to_string(),
            pincode: "411001".to_string(),
            country: "India".to_string(),
        },
        total_amount: 25000.0,
    }
}

/// Creates an eligible family `family_id` and files a claim for its member at [`fixed_now`].
pub async fn create_test_application(
    db: &DatabaseConnection,
    family_id: &str,
) -> Result<ApplicationRecord> {
    let family = create_eligible_registration(db, family_id).await?;
    let form = application_form(family_id, family.members[0].id);
    benefit::create_application(db, form, Vec::new(), fixed_now()).await
}
