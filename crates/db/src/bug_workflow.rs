//! Bug tracking service.
//!
//! Bugs are filed against a project version and may be linked to the
//! campaign ticket scenarios they were observed on. Like
//! [`CampaignWorkflow`], the service is stateless and resolves everything
//! from natural keys.

use indexmap::IndexMap;
use qadash_core::bug_status::{self, STATUS_OPEN};
use qadash_core::error::CoreError;
use qadash_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::bug::{
    BugChanges, BugDetail, BugFilter, BugLink, BugRow, CreateBug, NewBug, UpdateBug,
};
use crate::repositories::BugRepo;
use crate::workflow::{is_unique_violation, CampaignWorkflow, WorkflowError, WorkflowResult};

/// Maximum length (in characters) of a bug title.
pub const MAX_TITLE_LENGTH: usize = 200;

const TITLE_CONSTRAINT: &str = "uq_bugs_version_title";

/// Listing filters expressed with natural keys.
#[derive(Debug, Clone, Default)]
pub struct BugQuery {
    pub version: Option<String>,
    pub statuses: Option<Vec<String>>,
    pub criticality: Option<String>,
}

/// Stateless bug operations.
pub struct BugWorkflow;

impl BugWorkflow {
    /// List bugs of a project (optionally one version) with the total
    /// number matching the filters.
    pub async fn list_bugs(
        pool: &PgPool,
        project_name: &str,
        query: &BugQuery,
        limit: i64,
        offset: i64,
    ) -> WorkflowResult<(Vec<BugDetail>, i64)> {
        if let Some(statuses) = &query.statuses {
            for status in statuses {
                bug_status::validate_status(status)?;
            }
        }
        if let Some(criticality) = query.criticality.as_deref() {
            bug_status::validate_criticality(criticality)?;
        }

        let (project_id, version_id) = match query.version.as_deref() {
            Some(version) => {
                let (project, version) =
                    CampaignWorkflow::resolve_version(pool, project_name, version).await?;
                (project.id, Some(version.id))
            }
            None => (CampaignWorkflow::resolve_project(pool, project_name).await?.id, None),
        };

        let filter = BugFilter {
            version_id,
            statuses: query.statuses.clone(),
            criticality: query.criticality.clone(),
        };
        let rows = BugRepo::list(pool, project_id, &filter, limit, offset).await?;
        let total = BugRepo::count(pool, project_id, &filter).await?;
        Ok((with_links(pool, rows).await?, total))
    }

    /// Read one bug of a project.
    pub async fn get_bug(pool: &PgPool, project_name: &str, id: DbId) -> WorkflowResult<BugDetail> {
        let project = CampaignWorkflow::resolve_project(pool, project_name).await?;
        let row = BugRepo::find_row(pool, project.id, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Bug", id.to_string()))?;
        let mut details = with_links(pool, vec![row]).await?;
        details
            .pop()
            .ok_or_else(|| CoreError::not_found("Bug", id.to_string()).into())
    }

    /// File a bug against a version, linking it to the given campaign
    /// scenarios. A duplicate title within the version is a `Conflict`.
    pub async fn create_bug(
        pool: &PgPool,
        project_name: &str,
        input: &NewBug,
    ) -> WorkflowResult<BugDetail> {
        let title = validate_title(&input.title)?;
        bug_status::validate_criticality(&input.criticality)?;
        let status = input.status.as_deref().unwrap_or(STATUS_OPEN);
        bug_status::validate_status(status)?;

        let (project, version) =
            CampaignWorkflow::resolve_version(pool, project_name, &input.version).await?;

        let mut tx = pool.begin().await?;
        let bug = BugRepo::create(
            &mut tx,
            &CreateBug {
                project_id: project.id,
                version_id: version.id,
                title,
                url: input.url.clone(),
                description: input.description.clone(),
                criticality: input.criticality.clone(),
                status: status.to_string(),
            },
        )
        .await
        .map_err(|err| title_conflict(err, &version.version))?;
        link_all(&mut tx, bug.id, project.id, version.id, &input.related_to).await?;
        tx.commit().await?;

        tracing::info!(
            project = %project.name,
            version = %version.version,
            bug_id = bug.id,
            criticality = %bug.criticality,
            "Bug filed"
        );
        Self::get_bug(pool, project_name, bug.id).await
    }

    /// Apply `changes` to a bug. A status change must follow the bug
    /// lifecycle; links and unlinks are resolved against the bug's version
    /// after the change, and everything is applied in one transaction.
    pub async fn update_bug(
        pool: &PgPool,
        project_name: &str,
        id: DbId,
        changes: &BugChanges,
    ) -> WorkflowResult<BugDetail> {
        let project = CampaignWorkflow::resolve_project(pool, project_name).await?;
        let current = BugRepo::find(pool, project.id, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Bug", id.to_string()))?;

        let title = changes.title.as_deref().map(validate_title).transpose()?;
        if let Some(criticality) = changes.criticality.as_deref() {
            bug_status::validate_criticality(criticality)?;
        }
        if let Some(next) = changes.status.as_deref() {
            bug_status::validate_transition(&current.status, next)?;
        }
        let version_id = match changes.version.as_deref() {
            Some(label) => {
                let (_, version) = CampaignWorkflow::resolve_version(pool, project_name, label).await?;
                Some(version.id)
            }
            None => None,
        };

        let update = UpdateBug {
            version_id,
            title,
            url: changes.url.clone(),
            description: changes.description.clone(),
            criticality: changes.criticality.clone(),
            status: changes.status.clone(),
        };

        let mut tx = pool.begin().await?;
        let bug = BugRepo::update(&mut tx, current.id, &update)
            .await
            .map_err(|err| title_conflict(err, changes.version.as_deref().unwrap_or("its version")))?
            .ok_or_else(|| CoreError::not_found("Bug", id.to_string()))?;

        link_all(&mut tx, bug.id, project.id, bug.version_id, &changes.related_to).await?;
        for link in &changes.unlink_scenarios {
            let target = resolve(&mut tx, project.id, bug.version_id, link).await?;
            BugRepo::unlink(&mut tx, bug.id, target).await?;
        }
        tx.commit().await?;

        if current.status != bug.status {
            tracing::info!(
                project = %project.name,
                bug_id = bug.id,
                from = %current.status,
                to = %bug.status,
                "Bug status changed"
            );
        }
        Self::get_bug(pool, project_name, bug.id).await
    }
}

fn validate_title(title: &str) -> Result<String, CoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CoreError::Validation("Bug title must not be empty".into()));
    }
    let length = title.chars().count();
    if length > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Bug title exceeds maximum length of {MAX_TITLE_LENGTH} characters (got {length})"
        )));
    }
    Ok(title.to_string())
}

fn title_conflict(err: sqlx::Error, version: &str) -> WorkflowError {
    if is_unique_violation(&err, TITLE_CONSTRAINT) {
        WorkflowError::Core(CoreError::Conflict(format!(
            "A bug with this title already exists for version '{version}'"
        )))
    } else {
        WorkflowError::Database(err)
    }
}

async fn resolve(
    tx: &mut Transaction<'_, Postgres>,
    project_id: DbId,
    version_id: DbId,
    link: &BugLink,
) -> WorkflowResult<DbId> {
    BugRepo::resolve_link(tx, project_id, version_id, link)
        .await?
        .ok_or_else(|| {
            CoreError::not_found(
                "Campaign scenario",
                format!(
                    "{}/{}/{}",
                    link.occurrence, link.ticket_reference, link.scenario_internal_id
                ),
            )
            .into()
        })
}

async fn link_all(
    tx: &mut Transaction<'_, Postgres>,
    bug_id: DbId,
    project_id: DbId,
    version_id: DbId,
    links: &[BugLink],
) -> WorkflowResult<()> {
    for link in links {
        let target = resolve(tx, project_id, version_id, link).await?;
        BugRepo::link(tx, bug_id, target).await?;
    }
    Ok(())
}

/// Attach the scenario links to each row, keeping the rows' order.
async fn with_links(pool: &PgPool, rows: Vec<BugRow>) -> WorkflowResult<Vec<BugDetail>> {
    let ids: Vec<DbId> = rows.iter().map(|row| row.internal_id).collect();
    let mut details: IndexMap<DbId, BugDetail> = rows
        .into_iter()
        .map(|bug| {
            (
                bug.internal_id,
                BugDetail {
                    bug,
                    related_to: Vec::new(),
                },
            )
        })
        .collect();

    for link in BugRepo::list_links(pool, &ids).await? {
        if let Some(detail) = details.get_mut(&link.bug_id) {
            detail.related_to.push(link.into());
        }
    }
    Ok(details.into_values().collect())
}
