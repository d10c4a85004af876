//! Registration entity - A family or individual enrollment.
//!
//! The human-readable `registration_id` (the "family id") is what payments and
//! benefit applications reference. Members live in their own table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Registration database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "registrations")]
pub struct Model {
    /// Internal primary key
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable family id, unique across registrations (e.g. `"FAM001"`)
    #[sea_orm(unique)]
    pub registration_id: String,
    /// `"family"` or `"individual"`
    pub registration_type: String,
    /// Member count recorded at creation; always equals the member rows
    pub number_of_members: i32,
    /// Anchor for eligibility and due-month calculations
    pub registration_date: DateTimeUtc,
    /// `"Active"`, `"Pending"` or `"Inactive"`
    pub status: String,
    /// When the registration was created
    pub created_at: DateTimeUtc,
    /// When the registration was last edited
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Registration and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One registration has many members
    #[sea_orm(has_many = "super::member::Entity")]
    Members,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
