//! Bug models and DTOs.

use qadash_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A bug row from the `bugs` table.
#[derive(Debug, Clone, FromRow)]
pub struct Bug {
    pub id: DbId,
    pub project_id: DbId,
    pub version_id: DbId,
    pub title: String,
    pub url: String,
    pub description: String,
    pub criticality: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for filing a bug.
#[derive(Debug, Clone)]
pub struct CreateBug {
    pub project_id: DbId,
    pub version_id: DbId,
    pub title: String,
    pub url: String,
    pub description: String,
    pub criticality: String,
    pub status: String,
}

/// DTO for updating a bug. All fields are optional.
#[derive(Debug, Clone, Default)]
pub struct UpdateBug {
    pub version_id: Option<DbId>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub criticality: Option<String>,
    pub status: Option<String>,
}

/// Listing filters. `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct BugFilter {
    pub version_id: Option<DbId>,
    pub statuses: Option<Vec<String>>,
    pub criticality: Option<String>,
}

/// A bug as read back, with its version label.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BugRow {
    pub internal_id: DbId,
    pub version: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub criticality: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A campaign scenario a bug was observed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct BugLink {
    pub occurrence: i32,
    pub ticket_reference: String,
    /// Internal id of the repository scenario.
    pub scenario_internal_id: DbId,
}

/// A [`BugLink`] row tagged with its bug.
#[derive(Debug, Clone, FromRow)]
pub struct BugLinkRow {
    pub bug_id: DbId,
    pub occurrence: i32,
    pub ticket_reference: String,
    pub scenario_internal_id: DbId,
}

impl From<BugLinkRow> for BugLink {
    fn from(row: BugLinkRow) -> Self {
        Self {
            occurrence: row.occurrence,
            ticket_reference: row.ticket_reference,
            scenario_internal_id: row.scenario_internal_id,
        }
    }
}

/// A bug with the campaign scenarios it is linked to.
#[derive(Debug, Clone, Serialize)]
pub struct BugDetail {
    #[serde(flatten)]
    pub bug: BugRow,
    pub related_to: Vec<BugLink>,
}

/// A bug as filed by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBug {
    pub version: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    pub criticality: String,
    /// Defaults to `open`.
    pub status: Option<String>,
    #[serde(default)]
    pub related_to: Vec<BugLink>,
}

/// Changes to a bug. Links are resolved against the bug's version after
/// the change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BugChanges {
    pub version: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub criticality: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub related_to: Vec<BugLink>,
    #[serde(default)]
    pub unlink_scenarios: Vec<BugLink>,
}
