//! Benefit application entity - A member's claim for assistance.
//!
//! Claimant details (`member_name`, `member_aadhar`, `member_phone`) are a
//! point-in-time snapshot taken at filing and never follow later member edits.
//! The address is stored flattened; documents and status history live in
//! their own tables.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Benefit application database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "benefit_applications")]
pub struct Model {
    /// Internal primary key
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Public identifier `BEN-<year>-<seq>`, assigned once before insert
    #[sea_orm(unique)]
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
    /// One of the benefit type labels (e.g. `"Medical Emergency"`)
    pub benefit_type: String,
    /// Short reason for the claim
    pub reason: String,
    /// Longer description
    pub description: String,
    /// Place the expense was incurred
    pub place: String,
    /// Address: street
    pub address_street: String,
    /// Address: city
    pub address_city: String,
    /// Address: district
    pub address_district: String,
    /// Address: state
    pub address_state: String,
    /// Address: pincode
    pub address_pincode: String,
    /// Address: country
    pub address_country: String,
    /// Claimed amount
    pub total_amount: f64,
    /// Payout, set to half the claimed amount on approval
    pub approved_amount: f64,
    /// `"Pending"`, `"Under Review"`, `"Approved"` or `"Rejected"`
    pub status: String,
    /// Who last changed the status
    pub reviewed_by: Option<String>,
    /// When the status was last changed by a reviewer
    pub review_date: Option<DateTimeUtc>,
    /// Notes from the last review
    pub review_notes: Option<String>,
    /// When the application was filed
    pub created_at: DateTimeUtc,
    /// When the application was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `BenefitApplication` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One application has many documents
    #[sea_orm(has_many = "super::benefit_document::Entity")]
    Documents,
    /// One application has many status changes
    #[sea_orm(has_many = "super::status_change::Entity")]
    StatusHistory,
}

impl Related<super::benefit_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl Related<super::status_change::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
