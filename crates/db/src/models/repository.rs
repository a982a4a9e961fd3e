//! Scenario repository models: epics, features, scenarios.

use qadash_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// An epic row from the `epics` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Epic {
    pub id: DbId,
    pub project_id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A feature row from the `features` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Feature {
    pub id: DbId,
    pub project_id: DbId,
    pub epic_id: DbId,
    pub name: String,
    pub filename: Option<String>,
    pub description: String,
    pub tags: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A scenario row from the `scenarios` table.
///
/// `id` is the internal scenario id used by campaign links; `scenario_id`
/// is the identifier written in the feature file.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Scenario {
    pub id: DbId,
    pub project_id: DbId,
    pub feature_id: DbId,
    pub scenario_id: String,
    pub name: String,
    pub description: String,
    pub steps: String,
    pub tags: String,
    pub is_outline: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Feature listing row, joined with its epic name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FeatureEntry {
    pub epic: String,
    pub name: String,
    pub filename: Option<String>,
    pub tags: String,
}

/// Flattened scenario listing row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScenarioEntry {
    pub internal_id: DbId,
    pub epic: String,
    pub feature_name: String,
    pub feature_filename: Option<String>,
    pub scenario_id: String,
    pub name: String,
    pub tags: String,
    pub steps: String,
    pub is_outline: bool,
}

/// Counts of distinct repository items touched by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub epics: usize,
    pub features: usize,
    pub scenarios: usize,
}
