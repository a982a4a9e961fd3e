//! Handlers for the per-project scenario repository.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use qadash_core::repository_csv::parse_repository_csv;
use qadash_db::models::repository::{FeatureEntry, ImportSummary, ScenarioEntry};
use qadash_db::repositories::ScenarioRepo;
use qadash_db::workflow::CampaignWorkflow;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::handlers::campaign::total_count_header;
use crate::middleware::rbac::RequireAuth;
use crate::query::{PaginationParams, RepositoryParams, DEFAULT_LIMIT};
use crate::state::AppState;

/// Multipart field carrying the CSV export.
const UPLOAD_FIELD: &str = "file";

/// Repository listing, shaped by the `elements` query parameter.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RepositoryListing {
    Epics(Vec<String>),
    Features(Vec<FeatureEntry>),
    Scenarios(Vec<ScenarioEntry>),
}

/// POST /api/v1/projects/{name}/repository
///
/// Replace-or-insert the repository from a CSV export uploaded as the
/// multipart field `file`. The whole file is validated before anything is
/// written.
pub async fn upload(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(name): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<ImportSummary>> {
    let project = CampaignWorkflow::resolve_project(&state.pool, &name).await?;

    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        data = Some(bytes);
    }

    let data = data.ok_or_else(|| {
        AppError::BadRequest(format!("Missing multipart field '{UPLOAD_FIELD}'"))
    })?;
    let rows = parse_repository_csv(&data)?;
    let summary = ScenarioRepo::import(&state.pool, project.id, &rows).await?;

    tracing::info!(
        project = %project.name,
        user_id = user.user_id,
        rows = rows.len(),
        epics = summary.epics,
        features = summary.features,
        scenarios = summary.scenarios,
        "Scenario repository imported"
    );
    Ok(Json(summary))
}

/// GET /api/v1/projects/{name}/repository?elements=&epic=&feature=&offset=&limit=
///
/// `elements` is one of `epics`, `features`, `scenarios` (default). For
/// scenarios the total match count is returned in `X-Total-Count`.
pub async fn list(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<RepositoryParams>,
) -> AppResult<(HeaderMap, Json<RepositoryListing>)> {
    let project = CampaignWorkflow::resolve_project(&state.pool, &name).await?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let mut headers = HeaderMap::new();
    let listing = match params.elements.as_deref().unwrap_or("scenarios") {
        "epics" => RepositoryListing::Epics(
            ScenarioRepo::list_epics(&state.pool, project.id, limit, offset).await?,
        ),
        "features" => RepositoryListing::Features(
            ScenarioRepo::list_features(
                &state.pool,
                project.id,
                params.epic.as_deref(),
                limit,
                offset,
            )
            .await?,
        ),
        "scenarios" => {
            let (scenarios, total) = ScenarioRepo::list_scenarios(
                &state.pool,
                project.id,
                params.epic.as_deref(),
                params.feature.as_deref(),
                limit,
                offset,
            )
            .await?;
            headers = total_count_header(total);
            RepositoryListing::Scenarios(scenarios)
        }
        other => {
            return Err(AppError::BadRequest(format!(
                "Unknown elements '{other}'. Must be one of: epics, features, scenarios"
            )))
        }
    };
    Ok((headers, Json(listing)))
}

/// GET /api/v1/projects/{name}/epics
pub async fn list_epics(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<Vec<String>>> {
    let project = CampaignWorkflow::resolve_project(&state.pool, &name).await?;
    let epics =
        ScenarioRepo::list_epics(&state.pool, project.id, params.limit(), params.skip()).await?;
    Ok(Json(epics))
}

/// GET /api/v1/projects/{name}/epics/{epic}/features
pub async fn list_epic_features(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((name, epic)): Path<(String, String)>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<Vec<FeatureEntry>>> {
    let project = CampaignWorkflow::resolve_project(&state.pool, &name).await?;
    let features = ScenarioRepo::list_features(
        &state.pool,
        project.id,
        Some(&epic),
        params.limit(),
        params.skip(),
    )
    .await?;
    Ok(Json(features))
}
