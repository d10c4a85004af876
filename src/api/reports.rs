//! `/api/reports` endpoints.

use super::{
    ApiResponse, AppState, AsOfQuery,
    auth::{AdminUser, AuthUser},
};
use crate::{
    core::report::{self, BenefitStats, DashboardStats, FamilySummary},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::Utc;

async fn dashboard(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<DashboardStats>>> {
    let stats = report::dashboard_stats(state.db(), Utc::now()).await?;
    Ok(Json(ApiResponse::new(stats)))
}

async fn benefits(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<BenefitStats>>> {
    Ok(Json(ApiResponse::new(report::benefit_stats(state.db()).await?)))
}

async fn family(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(family_id): Path<String>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<ApiResponse<FamilySummary>>> {
    let as_of = query.resolve(Utc::now())?;
    let summary = report::family_summary(state.db(), &family_id, as_of).await?;
    Ok(Json(ApiResponse::new(summary)))
}

/// Routes nested under `/api/reports`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/benefits", get(benefits))
        .route("/family/:family_id", get(family))
}
