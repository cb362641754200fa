//! Import Endpoints
//!
//! # Endpoints
//!
//! - `POST /sections/import?mode=` - Import an uploaded JSON file (multipart
//!   field `file`), or the configured template when nothing is uploaded
//! - `POST /sections/import/path?mode=` - Import a JSON file at a server path
//!
//! `mode` is `replace` or `append`; it defaults to `TOC_IMPORT_MODE`.

use axum::{
    extract::{Multipart, Query, State},
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::http_error::ApiJson;
use crate::{AppState, HttpError};
use toc_core::{ImportMode, ImportReport};

/// Query parameters shared by both import endpoints
#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    mode: Option<String>,
}

impl ImportQuery {
    fn mode(&self) -> Result<Option<ImportMode>, HttpError> {
        match self.mode.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<ImportMode>()
                .map(Some)
                .map_err(HttpError::invalid_input),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportPathRequest {
    pub file_path: String,
}

/// Response from an import
#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub report: ImportReport,
}

/// An uploaded template file
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// Pull the `file` field out of a multipart body, ignoring other fields
async fn read_upload(mut multipart: Multipart) -> Result<Option<Upload>, HttpError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::invalid_input(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or("uploaded_file")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| HttpError::invalid_input(format!("Invalid file field: {}", e)))?;

        return Ok(Some(Upload {
            file_name,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

/// Import an uploaded template, falling back to the configured file
///
/// # Example
///
/// ```bash
/// # Upload
/// curl -X POST http://localhost:8000/sections/import -F "file=@study_template.json"
///
/// # Configured TOC_JSON_PATH, keeping the existing tree
/// curl -X POST "http://localhost:8000/sections/import?mode=append"
/// ```
async fn import_sections(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    multipart: Option<Multipart>,
) -> Result<Json<ImportResponse>, HttpError> {
    let options = state.config.import_options(query.mode()?);
    let upload = match multipart {
        Some(multipart) => read_upload(multipart).await?,
        None => None,
    };

    let _write_guard = state.write_lock.lock().await;

    let report = match upload {
        Some(upload) => {
            state
                .sections
                .import_from_bytes(&upload.bytes, &upload.file_name, options)
                .await?
        }
        None => {
            tracing::debug!(
                "No upload attached, importing {}",
                state.config.json_path.display()
            );
            state
                .sections
                .import_from_path(&state.config.json_path, options)
                .await?
        }
    };

    Ok(Json(ImportResponse { ok: true, report }))
}

/// Import a template file at an explicit server path
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/sections/import/path \
///   -H "Content-Type: application/json" \
///   -d '{"file_path": "/srv/templates/thesis.json"}'
/// ```
async fn import_sections_from_path(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    ApiJson(request): ApiJson<ImportPathRequest>,
) -> Result<Json<ImportResponse>, HttpError> {
    let options = state.config.import_options(query.mode()?);
    let path = request.file_path.trim();
    if path.is_empty() {
        return Err(HttpError::invalid_input("file_path must not be empty"));
    }

    let _write_guard = state.write_lock.lock().await;
    let report = state
        .sections
        .import_from_path(&PathBuf::from(path), options)
        .await?;

    Ok(Json(ImportResponse { ok: true, report }))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/sections/import", post(import_sections))
        .route("/sections/import/path", post(import_sections_from_path))
        .with_state(state)
}
