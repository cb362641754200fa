//! Section Endpoints
//!
//! # Endpoints
//!
//! - `GET /health` - Health check endpoint
//! - `GET /sections` - Whole outline as nested trees
//! - `GET /sections/:id` - One section (flat)
//! - `PATCH /sections/:id` - Rename a section
//! - `POST /sections` - Create a section
//! - `DELETE /sections/:id?strategy=` - Delete a section (`lift_children` or `cascade`)
//! - `PUT /sections/move` - Move a section before/after a sibling

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::http_error::ApiJson;
use crate::{AppState, HttpError};
use toc_core::{AnchorPosition, CreateSectionParams, DeleteStrategy, Section, SectionTree};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Plain success acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Response from section creation
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub ok: bool,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameSectionRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSectionRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub anchor_section_id: Option<String>,
    #[serde(default)]
    pub anchor_position: Option<AnchorPosition>,
}

#[derive(Debug, Deserialize)]
pub struct MoveSectionRequest {
    pub section_id: String,
    pub target_section_id: String,
    pub position: AnchorPosition,
}

/// Query parameters for delete
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    strategy: Option<String>,
}

async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Nested outline, roots and every child group ascending by order
///
/// # Example
///
/// ```bash
/// curl http://localhost:8000/sections
/// ```
async fn list_sections(
    State(state): State<AppState>,
) -> Result<Json<Vec<SectionTree>>, HttpError> {
    Ok(Json(state.sections.get_tree().await?))
}

async fn get_section(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Section>, HttpError> {
    Ok(Json(state.sections.get_section(&id).await?))
}

/// Rename a section, returning the updated row
///
/// # Example
///
/// ```bash
/// curl -X PATCH http://localhost:8000/sections/<id> \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Methods"}'
/// ```
async fn rename_section(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<RenameSectionRequest>,
) -> Result<Json<Section>, HttpError> {
    let _write_guard = state.write_lock.lock().await;

    Ok(Json(state.sections.rename_section(&id, &request.name).await?))
}

/// Create a section
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/sections \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Results", "anchor_section_id": "<id>", "anchor_position": "after"}'
/// ```
async fn create_section(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateSectionRequest>,
) -> Result<Json<CreatedResponse>, HttpError> {
    let _write_guard = state.write_lock.lock().await;

    let id = state
        .sections
        .create_section(CreateSectionParams {
            name: request.name,
            parent_id: request.parent_id,
            anchor_id: request.anchor_section_id,
            anchor_position: request.anchor_position,
        })
        .await?;

    Ok(Json(CreatedResponse { ok: true, id }))
}

async fn delete_section(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeleteQuery>,
) -> Result<Json<OkResponse>, HttpError> {
    let strategy = match params.strategy.as_deref() {
        None | Some("") => DeleteStrategy::default(),
        Some(raw) => raw.parse::<DeleteStrategy>().map_err(HttpError::invalid_input)?,
    };

    let _write_guard = state.write_lock.lock().await;
    state.sections.delete_section(&id, strategy).await?;

    Ok(Json(OkResponse { ok: true }))
}

/// Move a section before/after a sibling with the same parent
///
/// # Example
///
/// ```bash
/// curl -X PUT http://localhost:8000/sections/move \
///   -H "Content-Type: application/json" \
///   -d '{"section_id": "<a>", "target_section_id": "<c>", "position": "after"}'
/// ```
async fn move_section(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<MoveSectionRequest>,
) -> Result<Json<OkResponse>, HttpError> {
    let _write_guard = state.write_lock.lock().await;

    state
        .sections
        .move_section(
            &request.section_id,
            &request.target_section_id,
            request.position,
        )
        .await?;

    Ok(Json(OkResponse { ok: true }))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/sections", get(list_sections).post(create_section))
        .route("/sections/move", put(move_section))
        .route(
            "/sections/:id",
            get(get_section).patch(rename_section).delete(delete_section),
        )
        .with_state(state)
}

