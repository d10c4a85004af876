//! `/api/benefits` endpoints.
//!
//! `POST /apply` takes either `multipart/form-data` (text fields plus document
//! files) or a JSON body without files. Files are written to the upload
//! directory before the application is created and removed again if creation
//! fails.

use super::{
    ApiResponse, AppState,
    auth::{AdminUser, AuthUser},
};
use crate::{
    config::AppConfig,
    core::{
        benefit::{self, ApplicationRecord, StatusUpdate},
        documents::{self, DocumentTally, StoredDocument},
        form::{ApplicationForm, FormFields},
    },
    errors::{Error, Result},
};
use axum::{
    Json, RequestExt, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, Query, Request, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path as FsPath;
use tracing::{info, warn};

type Record = Json<ApiResponse<ApplicationRecord>>;
type Records = Json<ApiResponse<Vec<ApplicationRecord>>>;

/// Upper bound on document files in one submission.
const MAX_FILES_PER_REQUEST: u64 = 9;

/// Headroom for the text fields of a multipart body.
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
struct StatusFilter {
    status: Option<String>,
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

async fn store_file(
    config: &AppConfig,
    field: &str,
    original_name: &str,
    mime_type: &str,
    bytes: &[u8],
    now: DateTime<Utc>,
) -> Result<(String, String)> {
    let ext = documents::check_file_type(original_name, mime_type)?;
    documents::check_file_size(original_name, bytes.len() as u64, config.uploads.max_file_bytes)?;

    let filename = documents::stored_filename(field, now, OsRng.next_u32(), &ext);
    let path = config.uploads.directory.join(&filename);
    tokio::fs::create_dir_all(&config.uploads.directory).await?;
    tokio::fs::write(&path, bytes).await?;
    Ok((filename, path.to_string_lossy().into_owned()))
}

async fn discard(stored: &[StoredDocument]) {
    for doc in stored {
        if let Err(e) = tokio::fs::remove_file(FsPath::new(&doc.storage_path)).await {
            warn!("Failed to remove upload {}: {}", doc.storage_path, e);
        }
    }
}

/// Reads multipart text fields into a form map and writes file fields to disk.
///
/// On error every file already written is removed.
async fn read_multipart(
    config: &AppConfig,
    mut multipart: Multipart,
    now: DateTime<Utc>,
) -> Result<(FormFields, Vec<StoredDocument>)> {
    let mut fields = FormFields::new();
    let mut stored = Vec::new();
    let mut tally = DocumentTally::default();

    let outcome: Result<()> = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| Error::validation(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let Some(original_name) = field.file_name().map(ToString::to_string) else {
                let text = field.text().await.map_err(|e| Error::validation(e.body_text()))?;
                fields.insert(name, Value::String(text));
                continue;
            };

            let kind = tally.admit(&name)?;
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| Error::validation(e.body_text()))?;
            let (filename, storage_path) =
                store_file(config, &name, &original_name, &mime_type, &bytes, now).await?;

            stored.push(StoredDocument {
                kind,
                filename,
                original_name,
                storage_path,
                mime_type,
                size_bytes: i64::try_from(bytes.len()).unwrap_or(i64::MAX),
            });
        }
        Ok(())
    }
    .await;

    match outcome {
        Ok(()) => Ok((fields, stored)),
        Err(e) => {
            discard(&stored).await;
            Err(e)
        }
    }
}

async fn apply(
    State(state): State<AppState>,
    _user: AuthUser,
    request: Request,
) -> Result<(StatusCode, Record)> {
    let now = Utc::now();

    let (fields, stored) = if is_multipart(&request) {
        let multipart: Multipart = request
            .extract()
            .await
            .map_err(|e: MultipartRejection| Error::validation(e.body_text()))?;
        read_multipart(&state.config, multipart, now).await?
    } else {
        let Json(body): Json<Value> = request
            .extract()
            .await
            .map_err(|e: JsonRejection| Error::validation(e.body_text()))?;
        let Value::Object(fields) = body else {
            return Err(Error::validation("Expected a JSON object"));
        };
        (fields, Vec::new())
    };

    let created = match ApplicationForm::from_fields(&fields) {
        Ok(form) => benefit::create_application(state.db(), form, stored.clone(), now).await,
        Err(e) => Err(e),
    };
    let record = match created {
        Ok(record) => record,
        Err(e) => {
            discard(&stored).await;
            return Err(e);
        }
    };

    info!(
        "Application {} submitted with {} documents",
        record.application_id,
        record.documents.len()
    );
    let message = format!(
        "Application submitted successfully. Your application ID is {}",
        record.application_id
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(record).with_message(message)),
    ))
}

async fn track(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
) -> Result<Record> {
    let record = benefit::track_application(state.db(), &application_id).await?;
    Ok(Json(ApiResponse::new(record)))
}

async fn download(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
) -> Result<impl IntoResponse> {
    let ack = benefit::acknowledgment(state.db(), &application_id).await?;
    let disposition = format!(
        "attachment; filename=\"acknowledgment-{}.json\"",
        ack.application_id
    );
    Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(ack)))
}

async fn list_all(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<StatusFilter>,
) -> Result<Records> {
    let records = benefit::list_applications(state.db(), filter.status.as_deref()).await?;
    Ok(Json(ApiResponse::list(records)))
}

async fn by_family(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(family_id): Path<String>,
) -> Result<Records> {
    let records = benefit::list_family_applications(state.db(), &family_id).await?;
    Ok(Json(ApiResponse::list(records)))
}

async fn get_one(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Record> {
    let record = benefit::get_application(state.db(), id).await?;
    Ok(Json(ApiResponse::new(record)))
}

async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(mut update): Json<StatusUpdate>,
) -> Result<Record> {
    if update.reviewed_by.is_none() {
        update.reviewed_by = Some(admin.account.name);
    }
    let record = benefit::set_status(state.db(), id, update, Utc::now()).await?;
    let message = format!("Application status updated to {}", record.status);
    Ok(Json(ApiResponse::new(record).with_message(message)))
}

/// Routes nested under `/api/benefits`.
pub fn routes(config: &AppConfig) -> Router<AppState> {
    let body_limit = config
        .uploads
        .max_file_bytes
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(FORM_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route(
            "/apply",
            post(apply).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/track/:application_id", get(track))
        .route("/download/:application_id", get(download))
        .route("/all", get(list_all))
        .route("/family/:family_id", get(by_family))
        .route("/:id", get(get_one))
        .route("/:id/status", patch(update_status))
}
