//! Payment entity - A contribution payment for one member.
//!
//! The months a payment covers are stored in `payment_months`; `amount` is the
//! per-month contribution, so the record's value is `amount * months.len()`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Family id (registration id) the member belongs to
    pub family_id: String,
    /// Member this payment covers
    pub member_id: i64,
    /// Member name at the time of payment
    pub member_name: String,
    /// Contribution per month
    pub amount: f64,
    /// `"cash"` or `"scanner"`
    pub payment_method: String,
    /// `"Pending"`, `"Completed"` or `"Failed"`
    pub status: String,
    /// External or generated transaction reference
    pub transaction_id: String,
    /// Free-form notes
    pub notes: Option<String>,
    /// When the payment was recorded
    pub created_at: DateTimeUtc,
    /// When the payment was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One payment covers many months
    #[sea_orm(has_many = "super::payment_month::Entity")]
    Months,
}

impl Related<super::payment_month::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Months.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
