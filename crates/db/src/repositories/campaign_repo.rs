//! Repository for the `campaigns`, `campaign_tickets` and
//! `campaign_ticket_scenarios` tables.

use qadash_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::campaign::{
    Campaign, CampaignFilter, CampaignLight, CampaignScenarioRow, CampaignTicket,
    CampaignTicketSummary,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, project_id, version_id, occurrence, description, status, created_at, updated_at";

/// Select list for [`CampaignLight`] over `campaigns c JOIN projects p JOIN versions v`.
const LIGHT_COLUMNS: &str =
    "p.name AS project_name, v.version, c.occurrence, c.description, c.status";

/// Select list for [`CampaignScenarioRow`].
const SCENARIO_COLUMNS: &str = "ct.ticket_reference, s.id AS internal_id, e.name AS epic, \
                                f.name AS feature_name, s.scenario_id, s.name, s.steps, \
                                cts.status";

/// Provides campaign persistence operations.
pub struct CampaignRepo;

impl CampaignRepo {
    /// Insert the next campaign occurrence of a project version.
    ///
    /// The occurrence is computed and inserted in one statement. Two
    /// concurrent calls can compute the same number; the loser violates
    /// `uq_campaigns_version_occurrence`.
    pub async fn create_next(
        pool: &PgPool,
        project_id: DbId,
        version_id: DbId,
        description: &str,
    ) -> Result<Campaign, sqlx::Error> {
        let query = format!(
            "INSERT INTO campaigns (project_id, version_id, occurrence, description)
             SELECT $1, $2, COALESCE(MAX(occurrence), 0) + 1, $3
             FROM campaigns
             WHERE project_id = $1 AND version_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(project_id)
            .bind(version_id)
            .bind(description)
            .fetch_one(pool)
            .await
    }

    /// Find a campaign by its natural key.
    pub async fn find(
        pool: &PgPool,
        project_id: DbId,
        version_id: DbId,
        occurrence: i32,
    ) -> Result<Option<Campaign>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM campaigns
             WHERE project_id = $1 AND version_id = $2 AND occurrence = $3"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(project_id)
            .bind(version_id)
            .bind(occurrence)
            .fetch_optional(pool)
            .await
    }

    /// List campaigns of a project, most recently created version first,
    /// then newest occurrence.
    ///
    /// `limit` and `offset` are passed to PostgreSQL as-is.
    pub async fn list(
        pool: &PgPool,
        project_id: DbId,
        filter: &CampaignFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CampaignLight>, sqlx::Error> {
        let query = format!(
            "SELECT {LIGHT_COLUMNS}
             FROM campaigns c
             JOIN projects p ON p.id = c.project_id
             JOIN versions v ON v.id = c.version_id
             WHERE c.project_id = $1
               AND ($2::TEXT IS NULL OR v.version = $2)
               AND ($3::TEXT IS NULL OR c.status = $3)
             ORDER BY v.created_at DESC, v.id DESC, c.occurrence DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, CampaignLight>(&query)
            .bind(project_id)
            .bind(&filter.version)
            .bind(&filter.status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count campaigns of a project matching `filter`.
    pub async fn count(
        pool: &PgPool,
        project_id: DbId,
        filter: &CampaignFilter,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)
             FROM campaigns c
             JOIN versions v ON v.id = c.version_id
             WHERE c.project_id = $1
               AND ($2::TEXT IS NULL OR v.version = $2)
               AND ($3::TEXT IS NULL OR c.status = $3)",
        )
        .bind(project_id)
        .bind(&filter.version)
        .bind(&filter.status)
        .fetch_one(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Campaign tickets
    // -----------------------------------------------------------------------

    /// Link a ticket into a campaign (idempotent), returning the link id.
    pub async fn upsert_ticket(
        tx: &mut Transaction<'_, Postgres>,
        campaign_id: DbId,
        ticket_id: DbId,
        ticket_reference: &str,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO campaign_tickets (campaign_id, ticket_id, ticket_reference)
             VALUES ($1, $2, $3)
             ON CONFLICT ON CONSTRAINT uq_campaign_tickets_campaign_ticket DO UPDATE SET
                ticket_id = EXCLUDED.ticket_id
             RETURNING id",
        )
        .bind(campaign_id)
        .bind(ticket_id)
        .bind(ticket_reference)
        .fetch_one(&mut **tx)
        .await
    }

    /// Find the link of a ticket within a campaign.
    pub async fn find_ticket(
        pool: &PgPool,
        campaign_id: DbId,
        ticket_reference: &str,
    ) -> Result<Option<CampaignTicket>, sqlx::Error> {
        sqlx::query_as::<_, CampaignTicket>(
            "SELECT id, campaign_id, ticket_id, ticket_reference, created_at, updated_at
             FROM campaign_tickets
             WHERE campaign_id = $1 AND ticket_reference = $2",
        )
        .bind(campaign_id)
        .bind(ticket_reference)
        .fetch_optional(pool)
        .await
    }

    /// Tickets linked into a campaign, with their descriptions, by reference.
    pub async fn list_tickets(
        pool: &PgPool,
        campaign_id: DbId,
    ) -> Result<Vec<CampaignTicketSummary>, sqlx::Error> {
        sqlx::query_as::<_, CampaignTicketSummary>(
            "SELECT ct.ticket_reference, t.description AS summary
             FROM campaign_tickets ct
             JOIN tickets t ON t.id = ct.ticket_id
             WHERE ct.campaign_id = $1
             ORDER BY ct.ticket_reference",
        )
        .bind(campaign_id)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Campaign ticket scenarios
    // -----------------------------------------------------------------------

    /// Link a scenario under a campaign ticket. Returns `false` when the
    /// link already existed (its status is left untouched).
    pub async fn link_scenario(
        tx: &mut Transaction<'_, Postgres>,
        campaign_ticket_id: DbId,
        scenario_id: DbId,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO campaign_ticket_scenarios (campaign_ticket_id, scenario_id, status)
             VALUES ($1, $2, $3)
             ON CONFLICT ON CONSTRAINT uq_campaign_ticket_scenarios_ticket_scenario DO NOTHING",
        )
        .bind(campaign_ticket_id)
        .bind(scenario_id)
        .bind(status)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Every linked scenario of a campaign, optionally for one ticket only,
    /// ordered by ticket reference then repository position.
    pub async fn list_scenarios(
        pool: &PgPool,
        campaign_id: DbId,
        ticket_reference: Option<&str>,
    ) -> Result<Vec<CampaignScenarioRow>, sqlx::Error> {
        let query = format!(
            "SELECT {SCENARIO_COLUMNS}
             FROM campaign_ticket_scenarios cts
             JOIN campaign_tickets ct ON ct.id = cts.campaign_ticket_id
             JOIN scenarios s ON s.id = cts.scenario_id
             JOIN features f ON f.id = s.feature_id
             JOIN epics e ON e.id = f.epic_id
             WHERE ct.campaign_id = $1 AND ($2::TEXT IS NULL OR ct.ticket_reference = $2)
             ORDER BY ct.ticket_reference, e.name, f.name, s.scenario_id"
        );
        sqlx::query_as::<_, CampaignScenarioRow>(&query)
            .bind(campaign_id)
            .bind(ticket_reference)
            .fetch_all(pool)
            .await
    }

    /// One linked scenario of a campaign ticket, by internal scenario id.
    pub async fn find_scenario(
        pool: &PgPool,
        campaign_id: DbId,
        ticket_reference: &str,
        internal_id: DbId,
    ) -> Result<Option<CampaignScenarioRow>, sqlx::Error> {
        let query = format!(
            "SELECT {SCENARIO_COLUMNS}
             FROM campaign_ticket_scenarios cts
             JOIN campaign_tickets ct ON ct.id = cts.campaign_ticket_id
             JOIN scenarios s ON s.id = cts.scenario_id
             JOIN features f ON f.id = s.feature_id
             JOIN epics e ON e.id = f.epic_id
             WHERE ct.campaign_id = $1 AND ct.ticket_reference = $2 AND cts.scenario_id = $3"
        );
        sqlx::query_as::<_, CampaignScenarioRow>(&query)
            .bind(campaign_id)
            .bind(ticket_reference)
            .bind(internal_id)
            .fetch_optional(pool)
            .await
    }

    /// Set the status of one linked scenario. Returns the stored status, or
    /// `None` when no such link exists.
    pub async fn update_scenario_status(
        pool: &PgPool,
        campaign_id: DbId,
        ticket_reference: &str,
        internal_id: DbId,
        status: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "UPDATE campaign_ticket_scenarios cts SET status = $4
             FROM campaign_tickets ct
             WHERE ct.id = cts.campaign_ticket_id
               AND ct.campaign_id = $1
               AND ct.ticket_reference = $2
               AND cts.scenario_id = $3
             RETURNING cts.status",
        )
        .bind(campaign_id)
        .bind(ticket_reference)
        .bind(internal_id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }
}
