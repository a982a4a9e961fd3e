//! Campaign models: campaign rows, ticket links, and the aggregated views
//! returned by the workflow service.

use qadash_core::error::CoreError;
use qadash_core::repository_csv::normalize_key;
use qadash_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A campaign row from the `campaigns` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Campaign {
    pub id: DbId,
    pub project_id: DbId,
    pub version_id: DbId,
    pub occurrence: i32,
    pub description: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A campaign addressed by names rather than ids.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CampaignLight {
    pub project_name: String,
    pub version: String,
    pub occurrence: i32,
    pub description: String,
    pub status: String,
}

/// Optional filters for campaign listings.
#[derive(Debug, Clone, Default)]
pub struct CampaignFilter {
    pub version: Option<String>,
    pub status: Option<String>,
}

/// A campaign ticket row from the `campaign_tickets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CampaignTicket {
    pub id: DbId,
    pub campaign_id: DbId,
    pub ticket_id: DbId,
    pub ticket_reference: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One scenario as seen through a campaign ticket.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct ScenarioDetail {
    pub internal_id: DbId,
    pub epic: String,
    pub feature_name: String,
    pub scenario_id: String,
    pub name: String,
    pub steps: String,
    pub status: String,
}

/// A linked scenario row tagged with the campaign ticket it belongs to.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignScenarioRow {
    pub ticket_reference: String,
    #[sqlx(flatten)]
    pub detail: ScenarioDetail,
}

/// Ticket reference and description for each ticket linked into a campaign.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignTicketSummary {
    pub ticket_reference: String,
    pub summary: String,
}

/// A ticket inside a campaign with its linked scenarios.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignTicketView {
    pub reference: String,
    pub summary: String,
    pub scenarios: Vec<ScenarioDetail>,
}

/// Full campaign view grouped by ticket reference.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignTickets {
    pub project_name: String,
    pub version: String,
    pub occurrence: i32,
    pub status: String,
    pub tickets: Vec<CampaignTicketView>,
}

/// A scenario to attach, identified by its repository coordinates.
///
/// Missing repository entries are created on the fly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct ScenarioRef {
    pub epic: String,
    pub feature_name: String,
    pub scenario_id: String,
    #[serde(default)]
    pub feature_filename: Option<String>,
}

impl ScenarioRef {
    /// Copy with trimmed keys. A blank key is a `Validation` error; a blank
    /// filename becomes `None`.
    pub fn normalized(&self) -> Result<Self, CoreError> {
        Ok(Self {
            epic: normalize_key("epic", &self.epic)?,
            feature_name: normalize_key("feature_name", &self.feature_name)?,
            scenario_id: normalize_key("scenario_id", &self.scenario_id)?,
            feature_filename: self
                .feature_filename
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        })
    }
}

/// A batch of existing scenarios from one feature.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioBatch {
    pub epic: String,
    pub feature_name: String,
    pub scenario_ids: Vec<String>,
}

/// Result of a scenario status update.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioStatusUpdate {
    pub project_name: String,
    pub version: String,
    pub occurrence: i32,
    pub ticket_reference: String,
    pub internal_id: DbId,
    pub status: String,
}

/// Result of attaching scenarios to a campaign ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachSummary {
    pub ticket_reference: String,
    /// Scenario entries in the request (duplicates included).
    pub requested: usize,
    /// Links created by this call; already-linked scenarios are not counted.
    pub linked: usize,
}
