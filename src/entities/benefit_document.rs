//! Benefit document entity - Metadata of an uploaded supporting file.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Benefit document database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "benefit_documents")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    #[serde(skip)]
    pub id: i64,
    /// Owning application (internal key)
    #[serde(skip)]
    pub application_pk: i64,
    /// Stored file name
    pub filename: String,
    /// File name as uploaded
    pub original_name: String,
    /// Path of the stored file
    pub storage_path: String,
    /// Reported mime type
    pub mime_type: String,
    /// Size in bytes
    pub size_bytes: i64,
    /// `"aadhar"`, `"hospitalLetter"`, `"paymentSlip"`, `"registrationCopy"` or `"other"`
    pub document_type: String,
    /// When the file was received
    pub uploaded_at: DateTimeUtc,
}

/// Defines relationships between `BenefitDocument` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each document belongs to one application
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
