//! Human-readable identifier generation.
//!
//! Each identifier scope (e.g. benefit applications filed in 2024) owns a row in
//! the `sequences` table. Allocation seeds the row if missing and then bumps it
//! with a single `UPDATE sequences SET value = value + 1`, all inside the
//! caller's transaction, so two concurrent filings can never read the same number.

use crate::{
    entities::{Sequence, sequence},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, prelude::*, sea_query::OnConflict};
use tracing::debug;

/// Prefix of benefit application identifiers.
pub const APPLICATION_PREFIX: &str = "BEN";

/// Prefix of server-generated registration identifiers.
pub const REGISTRATION_PREFIX: &str = "FAM";

/// Counter key for applications filed in `year`.
#[must_use]
pub fn application_key(year: i32) -> String {
    format!("benefit_application:{year}")
}

/// Counter key for registrations created in `year`.
#[must_use]
pub fn registration_key(year: i32) -> String {
    format!("registration:{year}")
}

/// Formats `<prefix>-<year>-<seq>` with `seq` zero-padded to at least three digits.
///
/// Sequences past 999 simply grow a fourth digit.
#[must_use]
pub fn format_identifier(prefix: &str, year: i32, seq: i64) -> String {
    format!("{prefix}-{year}-{seq:03}")
}

/// Formats a benefit application id, e.g. `BEN-2024-001`.
#[must_use]
pub fn format_application_id(year: i32, seq: i64) -> String {
    format_identifier(APPLICATION_PREFIX, year, seq)
}

/// Atomically allocates the next value of the counter named `key`, starting at 1.
///
/// Should run inside the same transaction as the insert that consumes the value,
/// so a failed insert also gives the number back.
pub async fn next_sequence<C>(db: &C, key: &str, now: DateTime<Utc>) -> Result<i64>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    // Seed the counter; a concurrent seeder just makes this a no-op
    let seed = sequence::ActiveModel {
        key: Set(key.to_string()),
        value: Set(0),
        updated_at: Set(now),
    };
    Sequence::insert(seed)
        .on_conflict(
            OnConflict::column(sequence::Column::Key)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    // Perform atomic update: value = value + 1
    Sequence::update_many()
        .col_expr(
            sequence::Column::Value,
            Expr::col(sequence::Column::Value).add(1),
        )
        .col_expr(sequence::Column::UpdatedAt, Expr::value(now))
        .filter(sequence::Column::Key.eq(key))
        .exec(db)
        .await?;

    let counter = Sequence::find_by_id(key.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Sequence", key))?;

    debug!("Allocated {} = {}", key, counter.value);
    Ok(counter.value)
}
