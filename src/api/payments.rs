//! `/api/payments` endpoints.

use super::{
    ApiResponse, AppState, AsOfQuery,
    auth::{AdminUser, AuthUser},
};
use crate::{
    core::payment::{self, BatchOutcome, BatchPayment, FamilyLedger, NewPayment, PaymentRecord},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use chrono::Utc;
use serde::Deserialize;

type Record = Json<ApiResponse<PaymentRecord>>;
type Records = Json<ApiResponse<Vec<PaymentRecord>>>;

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

async fn list(State(state): State<AppState>, _admin: AdminUser) -> Result<Records> {
    let records = payment::list_payments(state.db()).await?;
    Ok(Json(ApiResponse::list(records)))
}

async fn submit(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(input): Json<NewPayment>,
) -> Result<(StatusCode, Record)> {
    let record = payment::submit_payment(state.db(), input, Utc::now()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(record).with_message("Payment recorded successfully")),
    ))
}

async fn submit_batch(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(input): Json<BatchPayment>,
) -> Result<(StatusCode, Json<ApiResponse<BatchOutcome>>)> {
    let outcome = payment::submit_batch(state.db(), input, Utc::now()).await?;
    let message = format!("Recorded {} payments", outcome.records.len());
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(outcome).with_message(message)),
    ))
}

async fn by_family(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(family_id): Path<String>,
) -> Result<Records> {
    let records = payment::list_family_payments(state.db(), &family_id).await?;
    Ok(Json(ApiResponse::list(records)))
}

async fn ledger(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(family_id): Path<String>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<ApiResponse<FamilyLedger>>> {
    let as_of = query.resolve(Utc::now())?;
    let ledger = payment::family_ledger(state.db(), &family_id, as_of).await?;
    Ok(Json(ApiResponse::new(ledger)))
}

async fn update_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<StatusBody>,
) -> Result<Record> {
    let record = payment::update_payment_status(state.db(), id, &body.status, Utc::now()).await?;
    Ok(Json(ApiResponse::new(record)))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<i64>>> {
    payment::delete_payment(state.db(), id).await?;
    Ok(Json(
        ApiResponse::new(id).with_message("Payment deleted successfully"),
    ))
}

/// Routes nested under `/api/payments`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(submit))
        .route("/batch", post(submit_batch))
        .route("/family/:family_id", get(by_family))
        .route("/family/:family_id/ledger", get(ledger))
        .route("/:id/status", patch(update_status))
        .route("/:id", delete(remove))
}
