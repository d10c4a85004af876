//! Bearer-token extractors.
//!
//! Handlers take [`AuthUser`] to require any signed-in account and
//! [`AdminUser`] to require an admin.

use super::AppState;
use crate::{
    core::account::{self, Claims},
    entities::account as account_entity,
    errors::Error,
    models::Role,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

/// A request carrying a valid session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Verified token claims
    pub claims: Claims,
    /// The account the token was issued to
    pub account: account_entity::Model,
}

/// A request carrying a valid admin session token.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

fn not_authorized(message: &str) -> Error {
    Error::Unauthorized {
        message: message.to_string(),
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| not_authorized("Not authorized, no token"))?;

        let claims = account::verify_token(token, &state.secrets.jwt_secret).map_err(|e| {
            debug!("Rejected token: {}", e);
            not_authorized("Not authorized")
        })?;

        let account = match account::get_profile(state.db(), claims.id).await {
            Ok(account) if account.role == claims.role.as_str() => account,
            Ok(_) | Err(Error::NotFound { .. }) => return Err(not_authorized("Not authorized")),
            Err(other) => return Err(other),
        };

        Ok(Self { claims, account })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.claims.role != Role::Admin {
            return Err(Error::Forbidden);
        }
        Ok(Self(user))
    }
}
