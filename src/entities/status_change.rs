//! Status change entity - One entry of an application's status history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status change database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "status_changes")]
pub struct Model {
    /// Unique identifier, also the append order
    #[sea_orm(primary_key)]
    #[serde(skip)]
    pub id: i64,
    /// Owning application (internal key)
    #[serde(skip)]
    pub application_pk: i64,
    /// Status the application moved to
    pub status: String,
    /// Who made the change
    pub changed_by: String,
    /// When the change happened
    pub changed_at: DateTimeUtc,
    /// Reviewer notes or a generated description
    pub notes: String,
}

/// Defines relationships between `StatusChange` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one application
    #[sea_orm(
        belongs_to = "super::benefit_application::Entity",
        from = "Column::ApplicationPk",
        to = "super::benefit_application::Column::Id",
        on_delete = "Cascade"
    )]
    Application,
}

impl Related<super::benefit_application::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Application.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
