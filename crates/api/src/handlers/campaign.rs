//! Handlers for `/projects/{name}/campaigns` and the nested ticket and
//! scenario resources of a campaign occurrence.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::Json;
use indexmap::IndexMap;
use qadash_core::campaign_status;
use qadash_core::types::DbId;
use qadash_db::models::campaign::{
    AttachSummary, CampaignFilter, CampaignLight, CampaignTickets, ScenarioBatch, ScenarioDetail,
    ScenarioRef, ScenarioStatusUpdate,
};
use qadash_db::workflow::CampaignWorkflow;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::query::{CampaignListParams, NewStatusParams, DEFAULT_LIMIT};
use crate::state::AppState;

/// Header carrying the unpaged row count of a listing.
const X_TOTAL_COUNT: &str = "x-total-count";

/// Header map carrying the total number of rows behind a paged listing.
pub fn total_count_header(total: i64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_TOTAL_COUNT, HeaderValue::from(total));
    headers
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /projects/{name}/campaigns`.
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub version: String,
    #[serde(default)]
    pub description: String,
}

/// Either a single item or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

/// Request body for attaching a ticket and its scenarios to a campaign.
#[derive(Debug, Deserialize)]
pub struct AttachTicketRequest {
    pub ticket_reference: String,
    #[serde(default = "no_scenarios")]
    pub scenarios: OneOrMany<ScenarioRef>,
}

fn no_scenarios() -> OneOrMany<ScenarioRef> {
    OneOrMany::Many(Vec::new())
}

/// Attach result together with the ticket's scenarios after the call.
#[derive(Debug, Serialize)]
pub struct AttachResponse {
    #[serde(flatten)]
    pub summary: AttachSummary,
    pub scenarios: Vec<ScenarioDetail>,
}

// ---------------------------------------------------------------------------
// Campaigns
// ---------------------------------------------------------------------------

/// GET /api/v1/projects/{name}/campaigns?version=&status=&skip=&limit=
///
/// Newest first. The total number of matching campaigns is returned in
/// `X-Total-Count`.
pub async fn list(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<CampaignListParams>,
) -> AppResult<(HeaderMap, Json<Vec<CampaignLight>>)> {
    if let Some(status) = params.status.as_deref() {
        campaign_status::validate_status(status)?;
    }
    let filter = CampaignFilter {
        version: params.version,
        status: params.status,
    };
    let (campaigns, total) = CampaignWorkflow::list_campaigns(
        &state.pool,
        &name,
        &filter,
        params.limit.unwrap_or(DEFAULT_LIMIT),
        params.skip.unwrap_or(0),
    )
    .await?;
    Ok((total_count_header(total), Json(campaigns)))
}

/// POST /api/v1/projects/{name}/campaigns
pub async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<CreateCampaignRequest>,
) -> AppResult<(StatusCode, Json<CampaignLight>)> {
    let campaign =
        CampaignWorkflow::create_campaign(&state.pool, &name, &input.version, &input.description)
            .await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

/// GET /api/v1/projects/{name}/campaigns/{version}/{occurrence}
pub async fn get(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((name, version, occurrence)): Path<(String, String, i32)>,
) -> AppResult<Json<CampaignLight>> {
    let campaign = CampaignWorkflow::get_campaign(&state.pool, &name, &version, occurrence).await?;
    Ok(Json(campaign))
}

/// PUT /api/v1/projects/{name}/campaigns/{version}/{occurrence}
///
/// Link a ticket into the campaign along with its scenarios. Repository
/// entries that do not exist yet are created.
pub async fn attach(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((name, version, occurrence)): Path<(String, String, i32)>,
    Json(input): Json<AttachTicketRequest>,
) -> AppResult<Json<AttachResponse>> {
    let scenarios = input.scenarios.into_vec();
    let summary = CampaignWorkflow::attach_ticket_scenarios(
        &state.pool,
        &name,
        &version,
        occurrence,
        &input.ticket_reference,
        &scenarios,
    )
    .await?;

    let scenarios = CampaignWorkflow::get_ticket_scenarios(
        &state.pool,
        &name,
        &version,
        occurrence,
        &summary.ticket_reference,
    )
    .await?
    .into_values()
    .collect();

    Ok(Json(AttachResponse { summary, scenarios }))
}

// ---------------------------------------------------------------------------
// Campaign tickets
// ---------------------------------------------------------------------------

/// GET /api/v1/projects/{name}/campaigns/{version}/{occurrence}/tickets
pub async fn tickets(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((name, version, occurrence)): Path<(String, String, i32)>,
) -> AppResult<Json<CampaignTickets>> {
    let view =
        CampaignWorkflow::get_campaign_tickets(&state.pool, &name, &version, occurrence).await?;
    Ok(Json(view))
}

/// GET /api/v1/projects/{name}/campaigns/{version}/{occurrence}/tickets/{reference}
///
/// Scenarios keyed by internal id.
pub async fn ticket_scenarios(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((name, version, occurrence, reference)): Path<(String, String, i32, String)>,
) -> AppResult<Json<IndexMap<DbId, ScenarioDetail>>> {
    let scenarios = CampaignWorkflow::get_ticket_scenarios(
        &state.pool,
        &name,
        &version,
        occurrence,
        &reference,
    )
    .await?;
    Ok(Json(scenarios))
}

/// PUT /api/v1/projects/{name}/campaigns/{version}/{occurrence}/tickets/{reference}
///
/// Link scenarios that already exist in the repository. Any unknown id
/// rejects the whole batch.
pub async fn add_scenarios(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((name, version, occurrence, reference)): Path<(String, String, i32, String)>,
    Json(batches): Json<Vec<ScenarioBatch>>,
) -> AppResult<Json<AttachSummary>> {
    let summary = CampaignWorkflow::add_ticket_scenarios(
        &state.pool,
        &name,
        &version,
        occurrence,
        &reference,
        &batches,
    )
    .await?;
    Ok(Json(summary))
}

// ---------------------------------------------------------------------------
// Campaign scenarios
// ---------------------------------------------------------------------------

/// GET .../tickets/{reference}/scenarios/{internal_id}
pub async fn scenario(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((name, version, occurrence, reference, internal_id)): Path<(
        String,
        String,
        i32,
        String,
        DbId,
    )>,
) -> AppResult<Json<ScenarioDetail>> {
    let detail = CampaignWorkflow::get_ticket_scenario(
        &state.pool,
        &name,
        &version,
        occurrence,
        &reference,
        internal_id,
    )
    .await?;
    Ok(Json(detail))
}

/// PUT .../tickets/{reference}/scenarios/{internal_id}/status?new_status=
pub async fn update_status(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path((name, version, occurrence, reference, internal_id)): Path<(
        String,
        String,
        i32,
        String,
        DbId,
    )>,
    Query(params): Query<NewStatusParams>,
) -> AppResult<Json<ScenarioStatusUpdate>> {
    let update = CampaignWorkflow::update_scenario_status(
        &state.pool,
        &name,
        &version,
        occurrence,
        &reference,
        internal_id,
        &params.new_status,
    )
    .await?;
    tracing::debug!(user_id = user.user_id, "Scenario status set by user");
    Ok(Json(update))
}
