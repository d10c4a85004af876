//! HTTP surface.
//!
//! | Prefix | Module |
//! |--------|--------|
//! | `/api/users`, `/api/admins` | [`accounts`] |
//! | `/api/registrations` | [`registrations`] |
//! | `/api/payments` | [`payments`] |
//! | `/api/benefits` | [`benefits`] |
//! | `/api/reports` | [`reports`] |
//!
//! Every success body is `{"success": true, "data": ...}`; failures are
//! rendered by [`error`].

pub mod accounts;
pub mod auth;
pub mod benefits;
pub mod error;
pub mod payments;
pub mod registrations;
pub mod reports;

use crate::{
    config::{AppConfig, Secrets},
    errors::{Error, Result},
};
use axum::{Router, routing::get};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool
    pub db: Arc<DatabaseConnection>,
    /// Settings from `config.toml`
    pub config: Arc<AppConfig>,
    /// Token and admin secrets
    pub secrets: Arc<Secrets>,
}

impl AppState {
    /// Borrows the connection pool.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Success body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Wraps a single value.
    pub const fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            count: None,
            message: None,
        }
    }

    /// Adds a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// Wraps a list and reports its length as `count`.
    pub fn list(data: Vec<T>) -> Self {
        let count = data.len();
        Self {
            success: true,
            data,
            count: Some(count),
            message: None,
        }
    }
}

/// `?asOf=` query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct AsOfQuery {
    #[serde(rename = "asOf")]
    as_of: Option<String>,
}

impl AsOfQuery {
    /// The requested reference instant, or `now` when absent.
    ///
    /// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC).
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let Some(raw) = self.as_of.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(now);
        };
        if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
            return Ok(instant.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .ok_or_else(|| Error::validation(format!("Invalid asOf '{raw}'")))
    }
}

async fn health() -> &'static str {
    "API is running..."
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/users", accounts::user_routes())
        .nest("/admins", accounts::admin_routes())
        .nest("/registrations", registrations::routes())
        .nest("/payments", payments::routes())
        .nest("/benefits", benefits::routes(&state.config))
        .nest("/reports", reports::routes());

    Router::new()
        .route("/", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::account::{self, NewAccount},
        models::Role,
        test_utils::*,
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    pub const JWT_SECRET: &str = "test-secret";
    pub const ADMIN_CODE: &str = "admin-code";

    pub async fn test_state() -> Result<AppState> {
        Ok(AppState {
            db: Arc::new(setup_test_db().await?),
            config: Arc::new(AppConfig::default()),
            secrets: Arc::new(Secrets {
                jwt_secret: JWT_SECRET.to_string(),
                admin_code: Some(ADMIN_CODE.to_string()),
            }),
        })
    }

    /// Registers an account with `role` and returns a bearer token for it.
    pub async fn token_for(state: &AppState, email: &str, role: Role) -> Result<String> {
        let input = NewAccount {
            name: "Test".to_string(),
            email: email.to_string(),
            password: "password".to_string(),
            admin_code: None,
        };
        let account = account::register_account(state.db(), input, role, Utc::now()).await?;
        account::issue_token(&account, JWT_SECRET, 1, Utc::now())
    }

    pub async fn send(
        state: &AppState,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        router(state.clone()).oneshot(request).await.unwrap()
    }

    pub async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    pub async fn expect_status(response: Response, status: StatusCode) -> Value {
        assert_eq!(response.status(), status);
        json_body(response).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::test_support::*;
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use chrono::TimeZone;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health() -> Result<()> {
        let state = test_state().await?;
        let response = router(state)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"API is running...");
        Ok(())
    }

    #[test]
    fn test_as_of_query() {
        let now = Utc.with_ymd_and_hms(2024, 5, 5, 5, 5, 5).unwrap();
        assert_eq!(AsOfQuery::default().resolve(now).unwrap(), now);

        let date = AsOfQuery {
            as_of: Some("2024-03-01".to_string()),
        };
        assert_eq!(
            date.resolve(now).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );

        let stamp = AsOfQuery {
            as_of: Some("2024-03-01T12:00:00+05:30".to_string()),
        };
        assert_eq!(
            stamp.resolve(now).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 6, 30, 0).unwrap()
        );

        let bad = AsOfQuery {
            as_of: Some("yesterday".to_string()),
        };
        assert!(bad.resolve(now).is_err());
    }

    #[test]
    fn test_list_response_counts() {
        let body = serde_json::to_value(ApiResponse::list(vec![1, 2, 3])).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 3);
        assert!(body.get("message").is_none());
    }
}
