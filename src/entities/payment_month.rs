//! Payment month entity - One `YYYY-MM` covered by a payment.
//!
//! `settled` mirrors whether the owning payment is Completed. A partial unique
//! index on `(member_id, month) WHERE settled = 1` guarantees a month is paid
//! by at most one completed payment.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment month database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_months")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning payment
    pub payment_id: i64,
    /// Member the owning payment covers (denormalised for the unique index)
    pub member_id: i64,
    /// Calendar month as `YYYY-MM`
    pub month: String,
    /// True while the owning payment is Completed
    pub settled: bool,
}

/// Defines relationships between `PaymentMonth` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each month row belongs to one payment
    #[sea_orm(
        belongs_to = "super::payment::Entity",
        from = "Column::PaymentId",
        to = "super::payment::Column::Id",
        on_delete = "Cascade"
    )]
    Payment,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
