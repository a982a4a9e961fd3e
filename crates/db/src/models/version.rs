//! Version entity model and DTOs.

use qadash_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A version row from the `versions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Version {
    pub id: DbId,
    pub project_id: DbId,
    pub version: String,
    pub status: String,
    pub started: Option<Timestamp>,
    pub end_forecast: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new version. Status always starts at `recorded`.
#[derive(Debug, Clone)]
pub struct CreateVersion {
    pub project_id: DbId,
    pub version: String,
    pub started: Option<Timestamp>,
    pub end_forecast: Option<Timestamp>,
}

/// DTO for updating a version. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVersion {
    pub status: Option<String>,
    pub started: Option<Timestamp>,
    pub end_forecast: Option<Timestamp>,
}
