//! Handlers for `/projects/{name}/bugs` and the per-version bug listing.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use qadash_core::bug_status::parse_status_filter;
use qadash_core::types::DbId;
use qadash_db::bug_workflow::{BugQuery, BugWorkflow};
use qadash_db::models::bug::{BugChanges, BugDetail, NewBug};

use crate::error::AppResult;
use crate::handlers::campaign::total_count_header;
use crate::middleware::rbac::RequireAuth;
use crate::query::{BugListParams, DEFAULT_LIMIT};
use crate::state::AppState;

/// GET /api/v1/projects/{name}/bugs?status=&criticality=&skip=&limit=
///
/// Bugs of every version. The total is returned in `X-Total-Count`.
pub async fn list(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<BugListParams>,
) -> AppResult<(HeaderMap, Json<Vec<BugDetail>>)> {
    list_bugs(&state, &name, None, params).await
}

/// GET /api/v1/projects/{name}/versions/{version}/bugs
pub async fn list_for_version(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
    Query(params): Query<BugListParams>,
) -> AppResult<(HeaderMap, Json<Vec<BugDetail>>)> {
    list_bugs(&state, &name, Some(version), params).await
}

/// GET /api/v1/projects/{name}/bugs/{id}
pub async fn get(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((name, id)): Path<(String, DbId)>,
) -> AppResult<Json<BugDetail>> {
    Ok(Json(BugWorkflow::get_bug(&state.pool, &name, id).await?))
}

/// POST /api/v1/projects/{name}/bugs
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<NewBug>,
) -> AppResult<(StatusCode, Json<BugDetail>)> {
    let bug = BugWorkflow::create_bug(&state.pool, &name, &input).await?;
    tracing::debug!(user_id = user.user_id, bug_id = bug.bug.internal_id, "Bug filed by user");
    Ok((StatusCode::CREATED, Json(bug)))
}

/// PUT /api/v1/projects/{name}/bugs/{id}
///
/// Partial update. `related_to` adds scenario links and
/// `unlink_scenarios` removes them.
pub async fn update(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((name, id)): Path<(String, DbId)>,
    Json(changes): Json<BugChanges>,
) -> AppResult<Json<BugDetail>> {
    Ok(Json(BugWorkflow::update_bug(&state.pool, &name, id, &changes).await?))
}

async fn list_bugs(
    state: &AppState,
    name: &str,
    version: Option<String>,
    params: BugListParams,
) -> AppResult<(HeaderMap, Json<Vec<BugDetail>>)> {
    let statuses = match params.status.as_deref() {
        Some(raw) => parse_status_filter(raw)?,
        None => None,
    };
    let query = BugQuery {
        version,
        statuses,
        criticality: params.criticality,
    };
    let (bugs, total) = BugWorkflow::list_bugs(
        &state.pool,
        name,
        &query,
        params.limit.unwrap_or(DEFAULT_LIMIT),
        params.skip.unwrap_or(0),
    )
    .await?;
    Ok((total_count_header(total), Json(bugs)))
}
