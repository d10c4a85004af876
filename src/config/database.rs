//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Invariants the entity macros cannot
//! express (the partial unique index over settled payment months) are added as raw SQL.

use crate::entities::{
    Account, BenefitApplication, BenefitDocument, Member, Payment, PaymentMonth, Registration,
    Sequence, StatusChange,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/member_benefits.sqlite?mode=rwc";

/// Raw statements applied after the entity tables exist.
const EXTRA_INDEXES: &[&str] = &[
    // A (member, month) pair may be covered by at most one completed payment.
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_unique_settled_member_month
        ON payment_months(member_id, month)
        WHERE settled = 1;",
    "CREATE INDEX IF NOT EXISTS idx_members_registration ON members(registration_pk);",
    "CREATE INDEX IF NOT EXISTS idx_payments_family ON payments(family_id);",
    "CREATE INDEX IF NOT EXISTS idx_applications_family ON benefit_applications(family_id);",
];

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file (created on demand) if no environment variable is set.
#[instrument]
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    if let Some(dir) = sqlite_parent_dir(&database_url) {
        std::fs::create_dir_all(dir)?;
    }
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Directory holding a file-backed `SQLite` database, if the URL names one.
fn sqlite_parent_dir(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next()?;
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
}

async fn create_table_for<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity definitions.
///
/// Parent tables are created before the tables that reference them. Safe to call on
/// every startup.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table_for(db, &schema, Account).await?;
    create_table_for(db, &schema, Registration).await?;
    create_table_for(db, &schema, Member).await?;
    create_table_for(db, &schema, Payment).await?;
    create_table_for(db, &schema, PaymentMonth).await?;
    create_table_for(db, &schema, BenefitApplication).await?;
    create_table_for(db, &schema, BenefitDocument).await?;
    create_table_for(db, &schema, StatusChange).await?;
    create_table_for(db, &schema, Sequence).await?;

    for statement in EXTRA_INDEXES {
        db.execute_unprepared(statement).await?;
    }

    info!("Database tables ensured.");
    Ok(())
}
