//! Repository for the `tickets` table.

use qadash_core::types::DbId;
use sqlx::PgPool;

use crate::models::ticket::{CreateTicket, Ticket, TicketWithCampaigns, UpdateTicket};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, project_id, version_id, reference, description, status, created_at, updated_at";

/// Provides CRUD operations for tickets.
pub struct TicketRepo;

impl TicketRepo {
    /// Insert a new ticket, returning the created row.
    ///
    /// A duplicate reference within the version violates `uq_tickets_version_reference`.
    pub async fn create(pool: &PgPool, input: &CreateTicket) -> Result<Ticket, sqlx::Error> {
        let query = format!(
            "INSERT INTO tickets (project_id, version_id, reference, description)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Ticket>(&query)
            .bind(input.project_id)
            .bind(input.version_id)
            .bind(&input.reference)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a ticket of a version by its reference.
    pub async fn find(
        pool: &PgPool,
        version_id: DbId,
        reference: &str,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM tickets WHERE version_id = $1 AND reference = $2");
        sqlx::query_as::<_, Ticket>(&query)
            .bind(version_id)
            .bind(reference)
            .fetch_optional(pool)
            .await
    }

    /// List the tickets of a version with the campaign occurrences each one
    /// has been linked into, ordered by reference.
    pub async fn list_with_campaigns(
        pool: &PgPool,
        version_id: DbId,
    ) -> Result<Vec<TicketWithCampaigns>, sqlx::Error> {
        sqlx::query_as::<_, TicketWithCampaigns>(
            "SELECT t.reference, t.description, t.status, t.created_at,
                    COALESCE(
                        ARRAY_AGG(DISTINCT c.occurrence ORDER BY c.occurrence)
                            FILTER (WHERE c.occurrence IS NOT NULL),
                        '{}'
                    ) AS campaign_occurrences
             FROM tickets t
             LEFT JOIN campaign_tickets ct ON ct.ticket_id = t.id
             LEFT JOIN campaigns c ON c.id = ct.campaign_id
             WHERE t.version_id = $1
             GROUP BY t.id
             ORDER BY t.reference",
        )
        .bind(version_id)
        .fetch_all(pool)
        .await
    }

    /// Update a ticket. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTicket,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!(
            "UPDATE tickets SET
                description = COALESCE($2, description),
                status = COALESCE($3, status)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Ticket>(&query)
            .bind(id)
            .bind(&input.description)
            .bind(&input.status)
            .fetch_optional(pool)
            .await
    }
}
