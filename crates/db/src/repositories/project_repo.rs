//! Repository for the `projects` table.

use qadash_core::version_status::{STATUS_ARCHIVED, STATUS_RECORDED};
use sqlx::PgPool;

use crate::models::project::{CreateProject, Project, ProjectSummary};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, created_at, updated_at";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project, returning the created row.
    ///
    /// A duplicate name violates `uq_projects_name`.
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let query = format!("INSERT INTO projects (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    /// Find a project by its canonical name.
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE name = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// List every project name in alphabetical order.
    pub async fn list_names(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT name FROM projects ORDER BY name")
            .fetch_all(pool)
            .await
    }

    /// List projects with their version counts per bucket.
    ///
    /// `limit` and `offset` are passed to PostgreSQL as-is; negative values
    /// are rejected by the database.
    pub async fn list_summaries(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProjectSummary>, sqlx::Error> {
        sqlx::query_as::<_, ProjectSummary>(
            "SELECT p.name,
                    COUNT(v.id) FILTER (WHERE v.status NOT IN ($1, $2)) AS current,
                    COUNT(v.id) FILTER (WHERE v.status = $1) AS future,
                    COUNT(v.id) FILTER (WHERE v.status = $2) AS archived
             FROM projects p
             LEFT JOIN versions v ON v.project_id = p.id
             GROUP BY p.id, p.name
             ORDER BY p.name
             LIMIT $3 OFFSET $4",
        )
        .bind(STATUS_RECORDED)
        .bind(STATUS_ARCHIVED)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}
