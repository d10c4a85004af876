//! Unified error type for the service.
//!
//! Core functions return [`Result`] and the HTTP layer maps each variant to a
//! status code in `api::error`.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// All failures surfaced by core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Underlying persistence failure
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Missing or malformed input
    #[error("{message}")]
    Validation {
        /// Human-readable description
        message: String,
    },

    /// An amount that is negative, zero where not allowed, or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// A referenced record does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record (e.g. "Registration")
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// No registration matches a family id lookup
    #[error("No family members found with this Family ID")]
    FamilyNotFound {
        /// The family id that was looked up
        family_id: String,
    },

    /// The write would violate a uniqueness or reference invariant
    #[error("{message}")]
    Conflict {
        /// Human-readable description
        message: String,
    },

    /// Every requested month is already paid for this member
    #[error("Nothing to pay: all selected months are already paid for member {member_id}")]
    NothingToPay {
        /// Member whose months were all paid (0 for an empty batch)
        member_id: i64,
    },

    /// The member has not completed the one-year membership window
    #[error("Benefit not eligible yet. {days_remaining} days remaining to complete 1 year.")]
    NotEligible {
        /// Days since registration
        days_elapsed: i64,
        /// Days left until eligibility
        days_remaining: i64,
    },

    /// Missing or invalid credentials
    #[error("{message}")]
    Unauthorized {
        /// Human-readable description
        message: String,
    },

    /// Authenticated but lacking the required role
    #[error("Access denied. Admin only.")]
    Forbidden,

    /// Filesystem failure while storing uploads or reading config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Session token could not be issued or verified
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Password hashing failed
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Human-readable description
        message: String,
    },
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Converts a unique-constraint violation into [`Error::Conflict`],
    /// passing every other database error through unchanged.
    pub fn conflict_on_unique(err: DbErr, message: impl Into<String>) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::Conflict {
                message: message.into(),
            },
            _ => Self::Database(err),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
