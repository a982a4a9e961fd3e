//! Handlers for `/projects/{name}/versions`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use qadash_core::error::CoreError;
use qadash_core::naming::validate_version_label;
use qadash_core::types::Timestamp;
use qadash_core::version_status;
use qadash_db::models::version::{CreateVersion, UpdateVersion, Version};
use qadash_db::repositories::VersionRepo;
use qadash_db::workflow::CampaignWorkflow;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::state::AppState;

/// Request body for `POST /projects/{name}/versions`.
#[derive(Debug, Deserialize)]
pub struct CreateVersionRequest {
    pub version: String,
    pub started: Option<Timestamp>,
    pub end_forecast: Option<Timestamp>,
}

/// POST /api/v1/projects/{name}/versions
pub async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<CreateVersionRequest>,
) -> AppResult<(StatusCode, Json<Version>)> {
    validate_version_label(&input.version)?;
    let project = CampaignWorkflow::resolve_project(&state.pool, &name).await?;

    let version = VersionRepo::create(
        &state.pool,
        &CreateVersion {
            project_id: project.id,
            version: input.version,
            started: input.started,
            end_forecast: input.end_forecast,
        },
    )
    .await?;

    tracing::info!(project = %project.name, version = %version.version, "Version created");
    Ok((StatusCode::CREATED, Json(version)))
}

/// GET /api/v1/projects/{name}/versions/{version}
pub async fn get(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
) -> AppResult<Json<Version>> {
    let (_project, version) = CampaignWorkflow::resolve_version(&state.pool, &name, &version).await?;
    Ok(Json(version))
}

/// PUT /api/v1/projects/{name}/versions/{version}
///
/// A status change must follow the version lifecycle.
pub async fn update(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
    Json(input): Json<UpdateVersion>,
) -> AppResult<Json<Version>> {
    let (project, current) = CampaignWorkflow::resolve_version(&state.pool, &name, &version).await?;

    if let Some(next) = input.status.as_deref() {
        version_status::validate_transition(&current.status, next)?;
    }

    let updated = VersionRepo::update(&state.pool, current.id, &input)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Version", version)))?;

    if updated.status != current.status {
        tracing::info!(
            project = %project.name,
            version = %updated.version,
            from = %current.status,
            to = %updated.status,
            "Version status changed"
        );
    }
    Ok(Json(updated))
}
