//! Sequence entity - Named monotonically increasing counters.
//! Keys look like `"benefit_application:2024"`; `value` is the last number handed out.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sequence database model - one counter per key
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sequences")]
pub struct Model {
    /// Counter name
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// Last value issued
    pub value: i64,
    /// When the counter last moved
    pub updated_at: DateTimeUtc,
}

/// `Sequence` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
