//! `/api/registrations` endpoints.

use super::{
    ApiResponse, AppState, AsOfQuery,
    auth::{AdminUser, AuthUser},
};
use crate::{
    core::{
        benefit::{self, MemberEligibility},
        registration::{self, NewRegistration, RegistrationRecord, RegistrationUpdate},
    },
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;

type Record = Json<ApiResponse<RegistrationRecord>>;
type Records = Json<ApiResponse<Vec<RegistrationRecord>>>;

async fn list(State(state): State<AppState>, _admin: AdminUser) -> Result<Records> {
    let records = registration::list_registrations(state.db()).await?;
    Ok(Json(ApiResponse::list(records)))
}

async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(input): Json<NewRegistration>,
) -> Result<(StatusCode, Record)> {
    let record = registration::create_registration(state.db(), input, Utc::now()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(record).with_message("Registration created successfully")),
    ))
}

async fn get_one(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Record> {
    let record = registration::get_registration(state.db(), id).await?;
    Ok(Json(ApiResponse::new(record)))
}

async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(patch): Json<RegistrationUpdate>,
) -> Result<Record> {
    let record = registration::update_registration(state.db(), id, patch, Utc::now()).await?;
    Ok(Json(
        ApiResponse::new(record).with_message("Registration updated successfully"),
    ))
}

async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<i64>>> {
    registration::delete_registration(state.db(), id).await?;
    Ok(Json(
        ApiResponse::new(id).with_message("Registration deleted successfully"),
    ))
}

async fn by_family(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(family_id): Path<String>,
) -> Result<Records> {
    let records = registration::find_by_family_id(state.db(), &family_id).await?;
    Ok(Json(ApiResponse::list(records)))
}

async fn eligibility(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(member_id): Path<i64>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<ApiResponse<MemberEligibility>>> {
    let as_of = query.resolve(Utc::now())?;
    let result = benefit::member_eligibility(state.db(), member_id, as_of).await?;
    Ok(Json(ApiResponse::new(result)))
}

/// Routes nested under `/api/registrations`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(update).delete(remove))
        .route("/family/:family_id", get(by_family))
        .route("/members/:member_id/eligibility", get(eligibility))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::super::test_support::*;
    use crate::{errors::Result, models::Role};
    use axum::http::StatusCode;
    use serde_json::json;

    fn family_body(id: &str) -> serde_json::Value {
        json!({
            "registrationId": id,
            "registrationType": "family",
            "numberOfMembers": 2,
            "registrationDate": "2023-01-01T00:00:00Z",
            "members": [
                {"name": "Lakshmi", "phone": "900000001", "aadharNumber": "1111 2222 3333"},
                {"name": "Arjun", "phone": "900000002", "aadharNumber": "1111 2222 4444", "monthlyContribution": 20}
            ]
        })
    }

    #[tokio::test]
    async fn test_admin_creates_and_user_reads_family() -> Result<()> {
        let state = test_state().await?;
        let admin = token_for(&state, "admin@x.com", Role::Admin).await?;
        let user = token_for(&state, "user@x.com", Role::User).await?;

        let response = send(&state, "POST", "/api/registrations", Some(&user), Some(family_body("FAM100"))).await;
        expect_status(response, StatusCode::FORBIDDEN).await;

        let response = send(&state, "POST", "/api/registrations", Some(&admin), Some(family_body("FAM100"))).await;
        let created = expect_status(response, StatusCode::CREATED).await;
        assert_eq!(created["data"]["registrationId"], "FAM100");
        assert_eq!(created["data"]["members"][1]["monthlyContribution"], 20.0);
        let member_id = created["data"]["members"][0]["id"].as_i64().unwrap();

        let response = send(&state, "POST", "/api/registrations", Some(&admin), Some(family_body("FAM100"))).await;
        expect_status(response, StatusCode::CONFLICT).await;

        let response = send(&state, "GET", "/api/registrations/family/fam100", Some(&user), None).await;
        let found = expect_status(response, StatusCode::OK).await;
        assert_eq!(found["count"], 1);

        let response = send(&state, "GET", "/api/registrations/family/FAM999", Some(&user), None).await;
        let missing = expect_status(response, StatusCode::NOT_FOUND).await;
        assert_eq!(missing["message"], "No family members found with this Family ID");

        let uri = format!("/api/registrations/members/{member_id}/eligibility?asOf=2023-06-01");
        let response = send(&state, "GET", &uri, Some(&user), None).await;
        let check = expect_status(response, StatusCode::OK).await;
        assert_eq!(check["data"]["eligible"], false);
        assert_eq!(check["data"]["daysElapsed"], 151);

        let response = send(&state, "GET", "/api/registrations", Some(&user), None).await;
        expect_status(response, StatusCode::FORBIDDEN).await;
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete() -> Result<()> {
        let state = test_state().await?;
        let admin = token_for(&state, "admin@x.com", Role::Admin).await?;

        let response = send(&state, "POST", "/api/registrations", Some(&admin), Some(family_body("FAM200"))).await;
        let created = expect_status(response, StatusCode::CREATED).await;
        let id = created["data"]["id"].as_i64().unwrap();

        let uri = format!("/api/registrations/{id}");
        let patch = json!({"status": "Inactive"});
        let response = send(&state, "PUT", &uri, Some(&admin), Some(patch)).await;
        let updated = expect_status(response, StatusCode::OK).await;
        assert_eq!(updated["data"]["status"], "Inactive");

        let response = send(&state, "DELETE", &uri, Some(&admin), None).await;
        expect_status(response, StatusCode::OK).await;

        let response = send(&state, "GET", &uri, Some(&admin), None).await;
        expect_status(response, StatusCode::NOT_FOUND).await;
        Ok(())
    }
}
