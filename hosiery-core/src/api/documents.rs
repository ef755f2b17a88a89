use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::Session;
use crate::error::LedgerError;
use crate::permissions::{require, Capability};
use crate::services::storage::{object_name, validate_upload};
use crate::services::{prefill_document, DocumentKind, Prefill, UploadKind};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub object: String,
}

#[derive(Debug, Deserialize)]
pub struct OcrRequest {
    pub url: String,
}

/// `POST /api/uploads/:kind` with a single multipart `file` field.
///
/// Returns the public URL the client then sends along with the record.
pub async fn upload(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(kind): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), LedgerError> {
    require(&session, Capability::UploadFiles)?;
    let kind: UploadKind = kind.parse()?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| LedgerError::validation(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| LedgerError::validation(format!("could not read upload: {}", e)))?;

        validate_upload(kind, &content_type, bytes.len())?;
        let object = object_name(kind, filename.as_deref(), Utc::now());
        let url = state.storage.upload(&object, &content_type, bytes.to_vec()).await?;

        info!(user_id = %session.user_id, %object, size = bytes.len(), "File uploaded");
        return Ok((StatusCode::CREATED, Json(UploadResponse { url, object })));
    }

    Err(LedgerError::validation("multipart field `file` is required"))
}

/// `POST /api/ocr/:kind` with `{ "url": ... }` of an uploaded image.
///
/// Never fails on OCR trouble; an empty pre-fill comes back instead.
pub async fn ocr_prefill(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(kind): Path<String>,
    Json(request): Json<OcrRequest>,
) -> Result<Json<Prefill>, LedgerError> {
    require(&session, Capability::UseOcr)?;
    let kind: DocumentKind = kind.parse()?;
    if request.url.trim().is_empty() {
        return Err(LedgerError::validation("url is required"));
    }
    let prefill = prefill_document(state.ocr.as_ref(), kind, request.url.trim()).await;
    Ok(Json(prefill))
}
