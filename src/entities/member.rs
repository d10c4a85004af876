//! Member entity - One person inside a registration.
//!
//! The member's `id` is the identity payments and claims are filed against.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Member database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "members")]
pub struct Model {
    /// Opaque member identity
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning registration (internal key, not the family id)
    pub registration_pk: i64,
    /// Zero-based order within the registration
    pub position: i32,
    /// Full name
    pub name: String,
    /// Contact phone number
    pub phone: String,
    /// Aadhar number
    pub aadhar_number: String,
    /// Fixed monthly contribution in rupees
    pub monthly_contribution: f64,
}

/// Defines relationships between Member and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each member belongs to one registration
    #[sea_orm(
        belongs_to = "super::registration::Entity",
        from = "Column::RegistrationPk",
        to = "super::registration::Column::Id",
        on_delete = "Cascade"
    )]
    Registration,
}

impl Related<super::registration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Registration.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
