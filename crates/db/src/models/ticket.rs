//! Ticket entity model and DTOs.

use qadash_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A ticket row from the `tickets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Ticket {
    pub id: DbId,
    pub project_id: DbId,
    pub version_id: DbId,
    pub reference: String,
    pub description: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new ticket. Status always starts at `open`.
#[derive(Debug, Clone)]
pub struct CreateTicket {
    pub project_id: DbId,
    pub version_id: DbId,
    pub reference: String,
    pub description: String,
}

/// DTO for updating a ticket. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTicket {
    pub description: Option<String>,
    pub status: Option<String>,
}

/// A ticket together with the campaign occurrences it has been linked into.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TicketWithCampaigns {
    pub reference: String,
    pub description: String,
    pub status: String,
    pub created_at: Timestamp,
    pub campaign_occurrences: Vec<i32>,
}
