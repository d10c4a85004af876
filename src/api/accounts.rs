//! `/api/users` and `/api/admins` endpoints.

use super::{
    ApiResponse, AppState,
    auth::{AdminUser, AuthUser},
};
use crate::{
    core::account::{self, Credentials, NewAccount, Session},
    entities::account as account_entity,
    errors::Result,
    models::Role,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;

type SessionResponse = Json<ApiResponse<Session>>;

fn session(state: &AppState, account: account_entity::Model) -> Result<Session> {
    let token = account::issue_token(
        &account,
        &state.secrets.jwt_secret,
        state.config.auth.token_ttl_days,
        Utc::now(),
    )?;
    Ok(Session { account, token })
}

async fn register_user(
    State(state): State<AppState>,
    Json(input): Json<NewAccount>,
) -> Result<(StatusCode, SessionResponse)> {
    let account = account::register_account(state.db(), input, Role::User, Utc::now()).await?;
    let session = session(&state, account)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(session))))
}

async fn login_user(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<SessionResponse> {
    let account = account::authenticate(state.db(), &credentials, Role::User).await?;
    Ok(Json(ApiResponse::new(session(&state, account)?)))
}

async fn user_profile(user: AuthUser) -> Json<ApiResponse<account_entity::Model>> {
    Json(ApiResponse::new(user.account))
}

async fn register_admin(
    State(state): State<AppState>,
    Json(input): Json<NewAccount>,
) -> Result<(StatusCode, SessionResponse)> {
    let account = account::register_admin(
        state.db(),
        input,
        state.secrets.admin_code.as_deref(),
        Utc::now(),
    )
    .await?;
    let session = session(&state, account)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(session))))
}

async fn login_admin(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<SessionResponse> {
    account::check_login_code(
        credentials.admin_code.as_deref(),
        state.secrets.admin_code.as_deref(),
    )?;
    let account = account::authenticate(state.db(), &credentials, Role::Admin).await?;
    Ok(Json(ApiResponse::new(session(&state, account)?)))
}

async fn admin_profile(AdminUser(admin): AdminUser) -> Json<ApiResponse<account_entity::Model>> {
    Json(ApiResponse::new(admin.account))
}

/// Routes nested under `/api/users`.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/profile", get(user_profile))
}

/// Routes nested under `/api/admins`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_admin))
        .route("/login", post(login_admin))
        .route("/profile", get(admin_profile))
}
