//! Handlers for `/projects/{name}/versions/{version}/tickets`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use qadash_core::error::CoreError;
use qadash_core::naming::validate_ticket_reference;
use qadash_core::ticket_status;
use qadash_db::models::ticket::{CreateTicket, Ticket, TicketWithCampaigns, UpdateTicket};
use qadash_db::repositories::TicketRepo;
use qadash_db::workflow::CampaignWorkflow;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::state::AppState;

/// Request body for creating a ticket.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicketRequest {
    #[validate(length(min = 1, max = 50))]
    pub reference: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
}

/// Request body for updating a ticket.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTicketRequest {
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub status: Option<String>,
}

/// GET /api/v1/projects/{name}/versions/{version}/tickets
pub async fn list(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
) -> AppResult<Json<Vec<TicketWithCampaigns>>> {
    let (_project, version) = CampaignWorkflow::resolve_version(&state.pool, &name, &version).await?;
    Ok(Json(TicketRepo::list_with_campaigns(&state.pool, version.id).await?))
}

/// POST /api/v1/projects/{name}/versions/{version}/tickets
pub async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
    Json(input): Json<CreateTicketRequest>,
) -> AppResult<(StatusCode, Json<Ticket>)> {
    input.validate()?;
    validate_ticket_reference(&input.reference)?;
    let (project, version) = CampaignWorkflow::resolve_version(&state.pool, &name, &version).await?;

    let ticket = TicketRepo::create(
        &state.pool,
        &CreateTicket {
            project_id: project.id,
            version_id: version.id,
            reference: input.reference,
            description: input.description,
        },
    )
    .await?;

    tracing::info!(
        project = %project.name,
        version = %version.version,
        ticket = %ticket.reference,
        "Ticket created"
    );
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// GET /api/v1/projects/{name}/versions/{version}/tickets/{reference}
pub async fn get(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((name, version, reference)): Path<(String, String, String)>,
) -> AppResult<Json<Ticket>> {
    let (_project, version) = CampaignWorkflow::resolve_version(&state.pool, &name, &version).await?;
    let ticket = TicketRepo::find(&state.pool, version.id, &reference)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Ticket", reference)))?;
    Ok(Json(ticket))
}

/// PUT /api/v1/projects/{name}/versions/{version}/tickets/{reference}
///
/// A status change must follow the ticket lifecycle.
pub async fn update(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path((name, version, reference)): Path<(String, String, String)>,
    Json(input): Json<UpdateTicketRequest>,
) -> AppResult<Json<Ticket>> {
    input.validate()?;
    let (_project, version) = CampaignWorkflow::resolve_version(&state.pool, &name, &version).await?;
    let current = TicketRepo::find(&state.pool, version.id, &reference)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Ticket", reference.clone())))?;

    if let Some(next) = input.status.as_deref() {
        ticket_status::validate_transition(&current.status, next)?;
    }

    let update = UpdateTicket {
        description: input.description,
        status: input.status,
    };
    let ticket = TicketRepo::update(&state.pool, current.id, &update)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Ticket", reference)))?;
    Ok(Json(ticket))
}
