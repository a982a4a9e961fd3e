//! Repository for the `versions` table.

use qadash_core::types::DbId;
use sqlx::PgPool;

use crate::models::version::{CreateVersion, UpdateVersion, Version};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, project_id, version, status, started, end_forecast, created_at, updated_at";

/// Provides CRUD operations for versions.
pub struct VersionRepo;

impl VersionRepo {
    /// Insert a new version, returning the created row.
    ///
    /// A duplicate label within the project violates `uq_versions_project_version`.
    pub async fn create(pool: &PgPool, input: &CreateVersion) -> Result<Version, sqlx::Error> {
        let query = format!(
            "INSERT INTO versions (project_id, version, started, end_forecast)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Version>(&query)
            .bind(input.project_id)
            .bind(&input.version)
            .bind(input.started)
            .bind(input.end_forecast)
            .fetch_one(pool)
            .await
    }

    /// Find a version of a project by its label.
    pub async fn find(
        pool: &PgPool,
        project_id: DbId,
        version: &str,
    ) -> Result<Option<Version>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM versions WHERE project_id = $1 AND version = $2");
        sqlx::query_as::<_, Version>(&query)
            .bind(project_id)
            .bind(version)
            .fetch_optional(pool)
            .await
    }

    /// List every version of a project in creation order.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Version>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM versions WHERE project_id = $1 ORDER BY id");
        sqlx::query_as::<_, Version>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Update a version. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateVersion,
    ) -> Result<Option<Version>, sqlx::Error> {
        let query = format!(
            "UPDATE versions SET
                status = COALESCE($2, status),
                started = COALESCE($3, started),
                end_forecast = COALESCE($4, end_forecast)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Version>(&query)
            .bind(id)
            .bind(&input.status)
            .bind(input.started)
            .bind(input.end_forecast)
            .fetch_optional(pool)
            .await
    }
}
