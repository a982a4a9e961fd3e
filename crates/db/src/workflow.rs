//! Campaign workflow service.
//!
//! Creates campaign occurrences, links tickets and scenarios into them,
//! reads the aggregated views, and records per-scenario execution status.
//! The service keeps no state of its own: every operation resolves its
//! inputs from natural keys and relies on the store's constraints and
//! transactions for consistency. Nothing is retried here; a `Conflict`
//! from [`CampaignWorkflow::create_campaign`] is the caller's to retry.

use indexmap::IndexMap;
use qadash_core::campaign_status::{normalize_scenario_status, SCENARIO_STATUS_DEFAULT};
use qadash_core::error::CoreError;
use qadash_core::naming::canonical_project_name;
use qadash_core::types::DbId;
use sqlx::PgPool;

use crate::models::campaign::{
    AttachSummary, Campaign, CampaignFilter, CampaignLight, CampaignTicketView, CampaignTickets,
    ScenarioBatch, ScenarioDetail, ScenarioRef, ScenarioStatusUpdate,
};
use crate::models::project::Project;
use crate::models::version::Version;
use crate::repositories::{CampaignRepo, ProjectRepo, ScenarioRepo, TicketRepo, VersionRepo};

/// Error returned by workflow operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// A resolved `(project, version, campaign)` triple.
struct CampaignScope {
    project: Project,
    version: Version,
    campaign: Campaign,
}

/// Stateless campaign workflow operations.
pub struct CampaignWorkflow;

impl CampaignWorkflow {
    // -----------------------------------------------------------------------
    // Resolution helpers
    // -----------------------------------------------------------------------

    /// Look up a project by name (case-insensitive).
    pub async fn resolve_project(pool: &PgPool, project_name: &str) -> WorkflowResult<Project> {
        let canonical = canonical_project_name(project_name);
        ProjectRepo::find_by_name(pool, &canonical)
            .await?
            .ok_or_else(|| CoreError::not_found("Project", canonical).into())
    }

    /// Look up a version of a project.
    pub async fn resolve_version(
        pool: &PgPool,
        project_name: &str,
        version: &str,
    ) -> WorkflowResult<(Project, Version)> {
        let project = Self::resolve_project(pool, project_name).await?;
        let version = VersionRepo::find(pool, project.id, version)
            .await?
            .ok_or_else(|| CoreError::not_found("Version", version))?;
        Ok((project, version))
    }

    async fn resolve_campaign(
        pool: &PgPool,
        project_name: &str,
        version: &str,
        occurrence: i32,
    ) -> WorkflowResult<CampaignScope> {
        let (project, version) = Self::resolve_version(pool, project_name, version).await?;
        let campaign = CampaignRepo::find(pool, project.id, version.id, occurrence)
            .await?
            .ok_or_else(|| {
                CoreError::not_found("Campaign", format!("{}/{occurrence}", version.version))
            })?;
        Ok(CampaignScope {
            project,
            version,
            campaign,
        })
    }

    // -----------------------------------------------------------------------
    // Campaigns
    // -----------------------------------------------------------------------

    /// Allocate the next occurrence for a project version.
    ///
    /// Fails with `NotFound` when the project or version does not exist and
    /// with `Conflict` when a concurrent call claimed the same occurrence.
    pub async fn create_campaign(
        pool: &PgPool,
        project_name: &str,
        version: &str,
        description: &str,
    ) -> WorkflowResult<CampaignLight> {
        let (project, version) = Self::resolve_version(pool, project_name, version).await?;

        let campaign = CampaignRepo::create_next(pool, project.id, version.id, description)
            .await
            .map_err(|err| {
                if is_unique_violation(&err, "uq_campaigns_version_occurrence") {
                    WorkflowError::Core(CoreError::Conflict(format!(
                        "A campaign for {}/{} was created concurrently; retry",
                        project.name, version.version
                    )))
                } else {
                    WorkflowError::Database(err)
                }
            })?;

        tracing::info!(
            project = %project.name,
            version = %version.version,
            occurrence = campaign.occurrence,
            "Campaign created"
        );

        Ok(light(&project, &version, &campaign))
    }

    /// Fetch one campaign.
    pub async fn get_campaign(
        pool: &PgPool,
        project_name: &str,
        version: &str,
        occurrence: i32,
    ) -> WorkflowResult<CampaignLight> {
        let scope = Self::resolve_campaign(pool, project_name, version, occurrence).await?;
        Ok(light(&scope.project, &scope.version, &scope.campaign))
    }

    /// List campaigns of a project with the total number matching `filter`.
    pub async fn list_campaigns(
        pool: &PgPool,
        project_name: &str,
        filter: &CampaignFilter,
        limit: i64,
        offset: i64,
    ) -> WorkflowResult<(Vec<CampaignLight>, i64)> {
        let project = Self::resolve_project(pool, project_name).await?;
        let campaigns = CampaignRepo::list(pool, project.id, filter, limit, offset).await?;
        let total = CampaignRepo::count(pool, project.id, filter).await?;
        Ok((campaigns, total))
    }

    // -----------------------------------------------------------------------
    // Attaching tickets and scenarios
    // -----------------------------------------------------------------------

    /// Link a ticket into a campaign together with a set of scenarios.
    ///
    /// Scenario repository entries that do not exist yet are created. The
    /// ticket must already exist in the campaign's version. Scenarios that
    /// are already linked (including duplicates within `scenarios`) are left
    /// as they are. Keys are trimmed, and a blank key rejects the call before
    /// anything is written. Everything happens in one transaction.
    pub async fn attach_ticket_scenarios(
        pool: &PgPool,
        project_name: &str,
        version: &str,
        occurrence: i32,
        ticket_reference: &str,
        scenarios: &[ScenarioRef],
    ) -> WorkflowResult<AttachSummary> {
        let scenarios = scenarios
            .iter()
            .map(ScenarioRef::normalized)
            .collect::<Result<Vec<_>, _>>()?;

        let scope = Self::resolve_campaign(pool, project_name, version, occurrence).await?;
        let ticket = TicketRepo::find(pool, scope.version.id, ticket_reference)
            .await?
            .ok_or_else(|| CoreError::not_found("Ticket", ticket_reference))?;

        let project_id = scope.project.id;
        let mut tx = pool.begin().await?;
        let campaign_ticket_id =
            CampaignRepo::upsert_ticket(&mut tx, scope.campaign.id, ticket.id, &ticket.reference)
                .await?;

        let mut linked = 0;
        for entry in &scenarios {
            let epic_id = ScenarioRepo::resolve_epic(&mut tx, project_id, &entry.epic).await?;
            let feature_id = ScenarioRepo::resolve_feature(
                &mut tx,
                project_id,
                epic_id,
                &entry.feature_name,
                entry.feature_filename.as_deref(),
            )
            .await?;
            let scenario_id =
                ScenarioRepo::resolve_scenario(&mut tx, project_id, feature_id, &entry.scenario_id)
                    .await?;
            if CampaignRepo::link_scenario(
                &mut tx,
                campaign_ticket_id,
                scenario_id,
                SCENARIO_STATUS_DEFAULT,
            )
            .await?
            {
                linked += 1;
            }
        }
        tx.commit().await?;

        tracing::info!(
            project = %scope.project.name,
            version = %scope.version.version,
            occurrence,
            ticket = %ticket.reference,
            requested = scenarios.len(),
            linked,
            "Ticket scenarios attached"
        );

        Ok(AttachSummary {
            ticket_reference: ticket.reference,
            requested: scenarios.len(),
            linked,
        })
    }

    /// Link existing repository scenarios under a campaign ticket.
    ///
    /// Unlike [`Self::attach_ticket_scenarios`], nothing is created in the
    /// repository: an unknown scenario id fails the whole call with
    /// `NotFound` and nothing is linked.
    pub async fn add_ticket_scenarios(
        pool: &PgPool,
        project_name: &str,
        version: &str,
        occurrence: i32,
        ticket_reference: &str,
        batches: &[ScenarioBatch],
    ) -> WorkflowResult<AttachSummary> {
        let scope = Self::resolve_campaign(pool, project_name, version, occurrence).await?;
        let ticket = TicketRepo::find(pool, scope.version.id, ticket_reference)
            .await?
            .ok_or_else(|| CoreError::not_found("Ticket", ticket_reference))?;

        let mut tx = pool.begin().await?;
        let campaign_ticket_id =
            CampaignRepo::upsert_ticket(&mut tx, scope.campaign.id, ticket.id, &ticket.reference)
                .await?;

        let mut requested = 0;
        let mut linked = 0;
        for batch in batches {
            requested += batch.scenario_ids.len();
            let found: IndexMap<String, DbId> = ScenarioRepo::find_ids(
                &mut tx,
                scope.project.id,
                &batch.epic,
                &batch.feature_name,
                &batch.scenario_ids,
            )
            .await?
            .into_iter()
            .collect();

            for scenario_id in &batch.scenario_ids {
                let internal_id = *found.get(scenario_id).ok_or_else(|| {
                    CoreError::not_found(
                        "Scenario",
                        format!("{}/{}/{scenario_id}", batch.epic, batch.feature_name),
                    )
                })?;
                if CampaignRepo::link_scenario(
                    &mut tx,
                    campaign_ticket_id,
                    internal_id,
                    SCENARIO_STATUS_DEFAULT,
                )
                .await?
                {
                    linked += 1;
                }
            }
        }
        tx.commit().await?;

        tracing::info!(
            project = %scope.project.name,
            occurrence,
            ticket = %ticket.reference,
            requested,
            linked,
            "Existing scenarios linked to campaign ticket"
        );

        Ok(AttachSummary {
            ticket_reference: ticket.reference,
            requested,
            linked,
        })
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Full campaign view grouped by ticket reference.
    ///
    /// Tickets linked without any scenario are listed with an empty list.
    pub async fn get_campaign_tickets(
        pool: &PgPool,
        project_name: &str,
        version: &str,
        occurrence: i32,
    ) -> WorkflowResult<CampaignTickets> {
        let scope = Self::resolve_campaign(pool, project_name, version, occurrence).await?;

        let mut tickets: IndexMap<String, CampaignTicketView> =
            CampaignRepo::list_tickets(pool, scope.campaign.id)
                .await?
                .into_iter()
                .map(|t| {
                    (
                        t.ticket_reference.clone(),
                        CampaignTicketView {
                            reference: t.ticket_reference,
                            summary: t.summary,
                            scenarios: Vec::new(),
                        },
                    )
                })
                .collect();

        for row in CampaignRepo::list_scenarios(pool, scope.campaign.id, None).await? {
            if let Some(ticket) = tickets.get_mut(&row.ticket_reference) {
                ticket.scenarios.push(row.detail);
            }
        }

        Ok(CampaignTickets {
            project_name: scope.project.name,
            version: scope.version.version,
            occurrence: scope.campaign.occurrence,
            status: scope.campaign.status,
            tickets: tickets.into_values().collect(),
        })
    }

    /// Scenarios linked under one ticket of a campaign, keyed by internal id.
    pub async fn get_ticket_scenarios(
        pool: &PgPool,
        project_name: &str,
        version: &str,
        occurrence: i32,
        ticket_reference: &str,
    ) -> WorkflowResult<IndexMap<DbId, ScenarioDetail>> {
        let scope = Self::resolve_campaign(pool, project_name, version, occurrence).await?;
        CampaignRepo::find_ticket(pool, scope.campaign.id, ticket_reference)
            .await?
            .ok_or_else(|| CoreError::not_found("Campaign ticket", ticket_reference))?;

        let rows =
            CampaignRepo::list_scenarios(pool, scope.campaign.id, Some(ticket_reference)).await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.detail.internal_id, row.detail))
            .collect())
    }

    /// One scenario linked under a campaign ticket.
    pub async fn get_ticket_scenario(
        pool: &PgPool,
        project_name: &str,
        version: &str,
        occurrence: i32,
        ticket_reference: &str,
        internal_id: DbId,
    ) -> WorkflowResult<ScenarioDetail> {
        let scope = Self::resolve_campaign(pool, project_name, version, occurrence).await?;
        let row = CampaignRepo::find_scenario(pool, scope.campaign.id, ticket_reference, internal_id)
            .await?
            .ok_or_else(|| {
                CoreError::not_found("Campaign scenario", format!("{ticket_reference}/{internal_id}"))
            })?;
        Ok(row.detail)
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Record the execution status of a linked scenario.
    ///
    /// Any non-blank status is accepted; no transition rules apply.
    pub async fn update_scenario_status(
        pool: &PgPool,
        project_name: &str,
        version: &str,
        occurrence: i32,
        ticket_reference: &str,
        internal_id: DbId,
        new_status: &str,
    ) -> WorkflowResult<ScenarioStatusUpdate> {
        let status = normalize_scenario_status(new_status)?;
        let scope = Self::resolve_campaign(pool, project_name, version, occurrence).await?;

        let stored = CampaignRepo::update_scenario_status(
            pool,
            scope.campaign.id,
            ticket_reference,
            internal_id,
            &status,
        )
        .await?
        .ok_or_else(|| {
            CoreError::not_found("Campaign scenario", format!("{ticket_reference}/{internal_id}"))
        })?;

        tracing::info!(
            project = %scope.project.name,
            occurrence,
            ticket = ticket_reference,
            internal_id,
            status = %stored,
            "Scenario status updated"
        );

        Ok(ScenarioStatusUpdate {
            project_name: scope.project.name,
            version: scope.version.version,
            occurrence: scope.campaign.occurrence,
            ticket_reference: ticket_reference.to_string(),
            internal_id,
            status: stored,
        })
    }
}

fn light(project: &Project, version: &Version, campaign: &Campaign) -> CampaignLight {
    CampaignLight {
        project_name: project.name.clone(),
        version: version.version.clone(),
        occurrence: campaign.occurrence,
        description: campaign.description.clone(),
        status: campaign.status.clone(),
    }
}

/// Whether `err` is a unique violation (SQLSTATE 23505) on `constraint`.
pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
