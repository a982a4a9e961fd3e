//! Project entity model and DTOs.

use qadash_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A project row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    /// Casefolded project name.
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new project. `name` must already be canonical.
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
}

/// A project with the number of versions in each listing bucket.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    pub current: i64,
    pub future: i64,
    pub archived: i64,
}
