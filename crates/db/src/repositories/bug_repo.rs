//! Repository for the `bugs` and `bug_scenarios` tables.

use qadash_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::bug::{Bug, BugFilter, BugLink, BugLinkRow, BugRow, CreateBug, UpdateBug};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, version_id, title, url, description, criticality, \
                       status, created_at, updated_at";

/// Columns of [`BugRow`], over `bugs b JOIN versions v`.
const ROW_COLUMNS: &str = "b.id AS internal_id, v.version, b.title, b.url, b.description, \
                           b.criticality, b.status, b.created_at, b.updated_at";

/// Provides CRUD operations for bugs and their scenario links.
pub struct BugRepo;

impl BugRepo {
    /// Insert a new bug, returning the created row.
    ///
    /// A duplicate title within the version violates `uq_bugs_version_title`.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateBug,
    ) -> Result<Bug, sqlx::Error> {
        let query = format!(
            "INSERT INTO bugs (project_id, version_id, title, url, description, criticality, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Bug>(&query)
            .bind(input.project_id)
            .bind(input.version_id)
            .bind(&input.title)
            .bind(&input.url)
            .bind(&input.description)
            .bind(&input.criticality)
            .bind(&input.status)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find a bug of a project by id.
    pub async fn find(
        pool: &PgPool,
        project_id: DbId,
        id: DbId,
    ) -> Result<Option<Bug>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bugs WHERE project_id = $1 AND id = $2");
        sqlx::query_as::<_, Bug>(&query)
            .bind(project_id)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Read one bug with its version label.
    pub async fn find_row(
        pool: &PgPool,
        project_id: DbId,
        id: DbId,
    ) -> Result<Option<BugRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ROW_COLUMNS}
             FROM bugs b
             JOIN versions v ON v.id = b.version_id
             WHERE b.project_id = $1 AND b.id = $2"
        );
        sqlx::query_as::<_, BugRow>(&query)
            .bind(project_id)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List bugs of a project, by version creation then id.
    ///
    /// `limit` and `offset` are passed to PostgreSQL as-is.
    pub async fn list(
        pool: &PgPool,
        project_id: DbId,
        filter: &BugFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BugRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ROW_COLUMNS}
             FROM bugs b
             JOIN versions v ON v.id = b.version_id
             WHERE b.project_id = $1
               AND ($2::BIGINT IS NULL OR b.version_id = $2)
               AND ($3::TEXT[] IS NULL OR b.status = ANY($3))
               AND ($4::TEXT IS NULL OR b.criticality = $4)
             ORDER BY v.created_at, v.id, b.id
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, BugRow>(&query)
            .bind(project_id)
            .bind(filter.version_id)
            .bind(&filter.statuses)
            .bind(&filter.criticality)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count bugs of a project matching `filter`.
    pub async fn count(
        pool: &PgPool,
        project_id: DbId,
        filter: &BugFilter,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)
             FROM bugs b
             WHERE b.project_id = $1
               AND ($2::BIGINT IS NULL OR b.version_id = $2)
               AND ($3::TEXT[] IS NULL OR b.status = ANY($3))
               AND ($4::TEXT IS NULL OR b.criticality = $4)",
        )
        .bind(project_id)
        .bind(filter.version_id)
        .bind(&filter.statuses)
        .bind(&filter.criticality)
        .fetch_one(pool)
        .await
    }

    /// Update a bug. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        input: &UpdateBug,
    ) -> Result<Option<Bug>, sqlx::Error> {
        let query = format!(
            "UPDATE bugs SET
                version_id = COALESCE($2, version_id),
                title = COALESCE($3, title),
                url = COALESCE($4, url),
                description = COALESCE($5, description),
                criticality = COALESCE($6, criticality),
                status = COALESCE($7, status)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Bug>(&query)
            .bind(id)
            .bind(input.version_id)
            .bind(&input.title)
            .bind(&input.url)
            .bind(&input.description)
            .bind(&input.criticality)
            .bind(&input.status)
            .fetch_optional(&mut **tx)
            .await
    }

    // -----------------------------------------------------------------------
    // Scenario links
    // -----------------------------------------------------------------------

    /// Resolve a [`BugLink`] to the campaign ticket scenario it names, within
    /// campaigns of one version.
    pub async fn resolve_link(
        tx: &mut Transaction<'_, Postgres>,
        project_id: DbId,
        version_id: DbId,
        link: &BugLink,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT cts.id
             FROM campaign_ticket_scenarios cts
             JOIN campaign_tickets ct ON ct.id = cts.campaign_ticket_id
             JOIN campaigns c ON c.id = ct.campaign_id
             WHERE c.project_id = $1
               AND c.version_id = $2
               AND c.occurrence = $3
               AND ct.ticket_reference = $4
               AND cts.scenario_id = $5",
        )
        .bind(project_id)
        .bind(version_id)
        .bind(link.occurrence)
        .bind(&link.ticket_reference)
        .bind(link.scenario_internal_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Link a bug to a campaign ticket scenario. Returns `false` when the
    /// link already existed.
    pub async fn link(
        tx: &mut Transaction<'_, Postgres>,
        bug_id: DbId,
        campaign_ticket_scenario_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO bug_scenarios (bug_id, campaign_ticket_scenario_id)
             VALUES ($1, $2)
             ON CONFLICT ON CONSTRAINT uq_bug_scenarios_bug_scenario DO NOTHING",
        )
        .bind(bug_id)
        .bind(campaign_ticket_scenario_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a link. Returns `false` when there was nothing to remove.
    pub async fn unlink(
        tx: &mut Transaction<'_, Postgres>,
        bug_id: DbId,
        campaign_ticket_scenario_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM bug_scenarios WHERE bug_id = $1 AND campaign_ticket_scenario_id = $2",
        )
        .bind(bug_id)
        .bind(campaign_ticket_scenario_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Links of the given bugs, ordered by bug, occurrence, ticket, scenario.
    pub async fn list_links(
        pool: &PgPool,
        bug_ids: &[DbId],
    ) -> Result<Vec<BugLinkRow>, sqlx::Error> {
        sqlx::query_as::<_, BugLinkRow>(
            "SELECT bs.bug_id, c.occurrence, ct.ticket_reference,
                    cts.scenario_id AS scenario_internal_id
             FROM bug_scenarios bs
             JOIN campaign_ticket_scenarios cts ON cts.id = bs.campaign_ticket_scenario_id
             JOIN campaign_tickets ct ON ct.id = cts.campaign_ticket_id
             JOIN campaigns c ON c.id = ct.campaign_id
             WHERE bs.bug_id = ANY($1)
             ORDER BY bs.bug_id, c.occurrence, ct.ticket_reference, cts.scenario_id",
        )
        .bind(bug_ids)
        .fetch_all(pool)
        .await
    }
}
