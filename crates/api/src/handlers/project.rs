//! Handlers for `/settings/projects` and the `/projects` listing.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use indexmap::IndexMap;
use qadash_core::naming::validate_project_name;
use qadash_core::version_status::{parse_sections, VersionBucket};
use qadash_db::models::project::{CreateProject, Project, ProjectSummary};
use qadash_db::models::version::Version;
use qadash_db::repositories::{ProjectRepo, VersionRepo};
use qadash_db::workflow::CampaignWorkflow;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::query::{PaginationParams, SectionsParams};
use crate::state::AppState;

/// Request body for `POST /settings/projects`.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

/// A project with the versions of each requested bucket.
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    pub name: String,
    #[serde(flatten)]
    pub sections: IndexMap<&'static str, Vec<Version>>,
}

/// POST /api/v1/settings/projects
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let name = validate_project_name(&input.name)?;
    let project = ProjectRepo::create(&state.pool, &CreateProject { name }).await?;
    tracing::info!(project = %project.name, user_id = admin.user_id, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/v1/settings/projects
pub async fn list_names(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<String>>> {
    Ok(Json(ProjectRepo::list_names(&state.pool).await?))
}

/// GET /api/v1/projects?skip=&limit=
pub async fn list(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<Vec<ProjectSummary>>> {
    let summaries =
        ProjectRepo::list_summaries(&state.pool, params.limit(), params.skip()).await?;
    Ok(Json(summaries))
}

/// GET /api/v1/projects/{name}?sections=current,future
///
/// Versions are grouped by bucket; all three buckets when `sections` is absent.
pub async fn get(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<SectionsParams>,
) -> AppResult<Json<ProjectDetail>> {
    let buckets = parse_sections(params.sections.as_deref())?;
    let project = CampaignWorkflow::resolve_project(&state.pool, &name).await?;
    let versions = VersionRepo::list_for_project(&state.pool, project.id).await?;

    let mut sections: IndexMap<&'static str, Vec<Version>> =
        buckets.iter().map(|b| (b.as_str(), Vec::new())).collect();
    for version in versions {
        let bucket = VersionBucket::for_status(&version.status);
        if let Some(list) = sections.get_mut(bucket.as_str()) {
            list.push(version);
        }
    }

    Ok(Json(ProjectDetail {
        name: project.name,
        sections,
    }))
}
