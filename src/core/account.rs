//! Account business logic - Registration, login and session tokens.
//!
//! Users and admins share one `accounts` table, so an email can hold only one
//! role. Passwords are stored as argon2 PHC strings; sessions are HS256 JWTs.

use crate::{
    entities::{Account, account},
    errors::{Error, Result},
    models::Role,
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use sea_orm::{Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Sign-up input. `admin_code` is only read for admin sign-up.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    /// Display name
    pub name: String,
    /// Login email, normalised to lowercase
    pub email: String,
    /// Plain password, at least six characters
    pub password: String,
    /// Enrollment code, required for admins
    #[serde(default)]
    pub admin_code: Option<String>,
}

/// Login input. `admin_code` is only read for admin login.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Login email
    pub email: String,
    /// Plain password
    pub password: String,
    /// Admin secret key, checked on admin login
    #[serde(default)]
    pub admin_code: Option<String>,
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub id: i64,
    /// Account role
    pub role: Role,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// An authenticated account with a fresh token.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// The signed-in account
    #[serde(flatten)]
    pub account: account::Model,
    /// Bearer token for later requests
    pub token: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash {
            message: e.to_string(),
        })
}

fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Checks an admin code supplied at sign-up. Any mismatch is a validation error.
pub fn check_enrollment_code(supplied: Option<&str>, expected: Option<&str>) -> Result<()> {
    let expected = expected.ok_or_else(|| Error::Config {
        message: "ADMIN_SECRET_CODE is not configured".to_string(),
    })?;
    if supplied != Some(expected) {
        return Err(Error::validation("Invalid admin code"));
    }
    Ok(())
}

/// Checks an admin code supplied at login.
pub fn check_login_code(supplied: Option<&str>, expected: Option<&str>) -> Result<()> {
    let expected = expected.ok_or_else(|| Error::Config {
        message: "ADMIN_SECRET_CODE is not configured".to_string(),
    })?;
    let supplied = supplied
        .filter(|code| !code.is_empty())
        .ok_or_else(|| Error::validation("Admin secret key is required"))?;
    if supplied != expected {
        return Err(Error::Unauthorized {
            message: "Invalid admin secret key".to_string(),
        });
    }
    Ok(())
}

/// Creates an account with the given role.
#[instrument(skip(db, input), fields(email = %input.email, role = %role))]
pub async fn register_account(
    db: &DatabaseConnection,
    input: NewAccount,
    role: Role,
    now: DateTime<Utc>,
) -> Result<account::Model> {
    let name = input.name.trim().to_string();
    let email = normalize_email(&input.email);
    if name.is_empty() || email.is_empty() {
        return Err(Error::validation("Name and email are required"));
    }
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if let Some(existing) = Account::find()
        .filter(account::Column::Email.eq(email.as_str()))
        .one(db)
        .await?
    {
        return Err(Error::Conflict {
            message: format!("Email already registered as {}", existing.role),
        });
    }

    let account = account::ActiveModel {
        name: Set(name),
        email: Set(email.clone()),
        password_hash: Set(hash_password(&input.password)?),
        role: Set(role.as_str().to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| Error::conflict_on_unique(e, format!("Email {email} is already registered")))?;

    info!("Registered {} account {}", role, account.id);
    Ok(account)
}

/// Creates an admin account after checking the enrollment code.
pub async fn register_admin(
    db: &DatabaseConnection,
    input: NewAccount,
    expected_code: Option<&str>,
    now: DateTime<Utc>,
) -> Result<account::Model> {
    check_enrollment_code(input.admin_code.as_deref(), expected_code)?;
    register_account(db, input, Role::Admin, now).await
}

/// Verifies credentials for an account of the given role.
#[instrument(skip(db, credentials), fields(email = %credentials.email, role = %role))]
pub async fn authenticate(
    db: &DatabaseConnection,
    credentials: &Credentials,
    role: Role,
) -> Result<account::Model> {
    let invalid = || Error::Unauthorized {
        message: INVALID_CREDENTIALS.to_string(),
    };

    let account = Account::find()
        .filter(account::Column::Email.eq(normalize_email(&credentials.email)))
        .one(db)
        .await?
        .ok_or_else(invalid)?;

    if account.role != role.as_str() || !verify_password(&credentials.password, &account.password_hash)
    {
        debug!("Rejected login for account {}", account.id);
        return Err(invalid());
    }
    Ok(account)
}

/// Issues a session token valid for `ttl_days`.
pub fn issue_token(
    account: &account::Model,
    secret: &str,
    ttl_days: i64,
    now: DateTime<Utc>,
) -> Result<String> {
    let claims = Claims {
        id: account.id,
        role: account.role.parse()?,
        iat: now.timestamp(),
        exp: (now + Duration::days(ttl_days)).timestamp(),
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Verifies a session token's signature and expiry.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Loads an account by id.
pub async fn get_profile(db: &DatabaseConnection, id: i64) -> Result<account::Model> {
    Account::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Account", id))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn signup(email: &str, password: &str) -> NewAccount {
        NewAccount {
            name: "Asha".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            admin_code: None,
        }
    }

    fn login(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
            admin_code: None,
        }
    }

    #[tokio::test]
    async fn test_register_and_authenticate() -> Result<()> {
        let db = setup_test_db().await?;
        let account =
            register_account(&db, signup(" Asha@Example.com", "secret1"), Role::User, fixed_now())
                .await?;
        assert_eq!(account.email, "asha@example.com");
        assert_ne!(account.password_hash, "secret1");

        let found = authenticate(&db, &login("asha@example.com", "secret1"), Role::User).await?;
        assert_eq!(found.id, account.id);

        for attempt in [
            login("asha@example.com", "wrong-pass"),
            login("nobody@example.com", "secret1"),
        ] {
            let err = authenticate(&db, &attempt, Role::User).await.unwrap_err();
            assert_eq!(err.to_string(), "Invalid email or password");
        }

        // Right password, wrong role
        let err = authenticate(&db, &login("asha@example.com", "secret1"), Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() -> Result<()> {
        let db = setup_test_db().await?;

        let err = register_account(&db, signup("a@b.c", "12345"), Role::User, fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        register_account(&db, signup("a@b.c", "123456"), Role::User, fixed_now()).await?;
        let mut admin = signup("A@B.C", "123456");
        admin.admin_code = Some("code".to_string());
        let err = register_admin(&db, admin, Some("code"), fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_register_admin_requires_code() -> Result<()> {
        let db = setup_test_db().await?;

        let mut input = signup("admin@example.com", "123456");
        input.admin_code = Some("guess".to_string());
        let err = register_admin(&db, input.clone(), Some("code"), fixed_now())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid admin code");

        input.admin_code = Some("code".to_string());
        let admin = register_admin(&db, input, Some("code"), fixed_now()).await?;
        assert_eq!(admin.role, "admin");
        Ok(())
    }

    #[test]
    fn test_login_code_checks() {
        assert!(matches!(
            check_login_code(None, Some("code")).unwrap_err(),
            Error::Validation { .. }
        ));
        assert!(matches!(
            check_login_code(Some("nope"), Some("code")).unwrap_err(),
            Error::Unauthorized { .. }
        ));
        assert!(check_login_code(Some("code"), Some("code")).is_ok());
        assert!(matches!(
            check_login_code(Some("code"), None).unwrap_err(),
            Error::Config { .. }
        ));
    }

    #[tokio::test]
    async fn test_token_round_trip_and_tamper() -> Result<()> {
        let db = setup_test_db().await?;
        let account =
            register_account(&db, signup("t@example.com", "123456"), Role::User, Utc::now())
                .await?;

        let token = issue_token(&account, "secret", 30, Utc::now())?;
        let claims = verify_token(&token, "secret")?;
        assert_eq!(claims.id, account.id);
        assert_eq!(claims.role, Role::User);

        assert!(matches!(
            verify_token(&token, "other-secret").unwrap_err(),
            Error::Token(_)
        ));

        let expired = issue_token(&account, "secret", -2, Utc::now())?;
        assert!(verify_token(&expired, "secret").is_err());

        assert_eq!(get_profile(&db, account.id).await?.email, "t@example.com");
        Ok(())
    }
}
