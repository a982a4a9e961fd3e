//! Repository for the scenario repository tables (`epics`, `features`,
//! `scenarios`).

use std::collections::HashSet;

use qadash_core::repository_csv::RepositoryRow;
use qadash_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::repository::{FeatureEntry, ImportSummary, ScenarioEntry};

/// Select list for [`ScenarioEntry`] over `scenarios s JOIN features f JOIN epics e`.
const ENTRY_COLUMNS: &str = "s.id AS internal_id, e.name AS epic, f.name AS feature_name, \
                             f.filename AS feature_filename, s.scenario_id, s.name, s.tags, \
                             s.steps, s.is_outline";

/// Provides import, lookup and listing operations for the scenario repository.
pub struct ScenarioRepo;

impl ScenarioRepo {
    /// Upsert every row of a parsed repository export in one transaction.
    ///
    /// Existing epics, features and scenarios are matched on their natural
    /// keys and their descriptive columns overwritten; nothing is deleted.
    pub async fn import(
        pool: &PgPool,
        project_id: DbId,
        rows: &[RepositoryRow],
    ) -> Result<ImportSummary, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let mut epics = HashSet::new();
        let mut features = HashSet::new();
        let mut scenarios = HashSet::new();

        for row in rows {
            let epic_id = Self::resolve_epic(&mut tx, project_id, &row.epic).await?;
            epics.insert(epic_id);

            let feature_id = sqlx::query_scalar::<_, DbId>(
                "INSERT INTO features (project_id, epic_id, name, filename, description, tags)
                 VALUES ($1, $2, $3, NULLIF($4, ''), $5, $6)
                 ON CONFLICT ON CONSTRAINT uq_features_epic_name DO UPDATE SET
                    filename = COALESCE(EXCLUDED.filename, features.filename),
                    description = EXCLUDED.description,
                    tags = EXCLUDED.tags
                 RETURNING id",
            )
            .bind(project_id)
            .bind(epic_id)
            .bind(&row.feature_name)
            .bind(&row.feature_filename)
            .bind(&row.feature_description)
            .bind(&row.feature_tags)
            .fetch_one(&mut *tx)
            .await?;
            features.insert(feature_id);

            let scenario_id = sqlx::query_scalar::<_, DbId>(
                "INSERT INTO scenarios
                    (project_id, feature_id, scenario_id, name, description, steps, tags, is_outline)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT ON CONSTRAINT uq_scenarios_feature_scenario DO UPDATE SET
                    name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    steps = EXCLUDED.steps,
                    tags = EXCLUDED.tags,
                    is_outline = EXCLUDED.is_outline
                 RETURNING id",
            )
            .bind(project_id)
            .bind(feature_id)
            .bind(&row.scenario_id)
            .bind(&row.scenario_name)
            .bind(&row.scenario_description)
            .bind(&row.scenario_steps)
            .bind(&row.scenario_tags)
            .bind(row.scenario_is_outline)
            .fetch_one(&mut *tx)
            .await?;
            scenarios.insert(scenario_id);
        }

        tx.commit().await?;
        Ok(ImportSummary {
            epics: epics.len(),
            features: features.len(),
            scenarios: scenarios.len(),
        })
    }

    /// Return the id of the named epic, creating it if needed.
    pub async fn resolve_epic(
        tx: &mut Transaction<'_, Postgres>,
        project_id: DbId,
        name: &str,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO epics (project_id, name) VALUES ($1, $2)
             ON CONFLICT ON CONSTRAINT uq_epics_project_name DO UPDATE SET name = EXCLUDED.name
             RETURNING id",
        )
        .bind(project_id)
        .bind(name)
        .fetch_one(&mut **tx)
        .await
    }

    /// Return the id of the named feature, creating it if needed.
    ///
    /// A filename is only recorded when the feature does not have one yet.
    pub async fn resolve_feature(
        tx: &mut Transaction<'_, Postgres>,
        project_id: DbId,
        epic_id: DbId,
        name: &str,
        filename: Option<&str>,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO features (project_id, epic_id, name, filename) VALUES ($1, $2, $3, $4)
             ON CONFLICT ON CONSTRAINT uq_features_epic_name DO UPDATE SET
                filename = COALESCE(features.filename, EXCLUDED.filename)
             RETURNING id",
        )
        .bind(project_id)
        .bind(epic_id)
        .bind(name)
        .bind(filename)
        .fetch_one(&mut **tx)
        .await
    }

    /// Return the internal id of a scenario, creating a bare entry if needed.
    pub async fn resolve_scenario(
        tx: &mut Transaction<'_, Postgres>,
        project_id: DbId,
        feature_id: DbId,
        scenario_id: &str,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO scenarios (project_id, feature_id, scenario_id) VALUES ($1, $2, $3)
             ON CONFLICT ON CONSTRAINT uq_scenarios_feature_scenario DO UPDATE SET
                scenario_id = EXCLUDED.scenario_id
             RETURNING id",
        )
        .bind(project_id)
        .bind(feature_id)
        .bind(scenario_id)
        .fetch_one(&mut **tx)
        .await
    }

    /// Look up existing scenarios of one feature by their file identifiers.
    ///
    /// Returns `(scenario_id, internal_id)` pairs for the identifiers found;
    /// unknown identifiers are simply absent from the result.
    pub async fn find_ids(
        tx: &mut Transaction<'_, Postgres>,
        project_id: DbId,
        epic: &str,
        feature_name: &str,
        scenario_ids: &[String],
    ) -> Result<Vec<(String, DbId)>, sqlx::Error> {
        sqlx::query_as::<_, (String, DbId)>(
            "SELECT s.scenario_id, s.id
             FROM scenarios s
             JOIN features f ON f.id = s.feature_id
             JOIN epics e ON e.id = f.epic_id
             WHERE s.project_id = $1 AND e.name = $2 AND f.name = $3
               AND s.scenario_id = ANY($4)",
        )
        .bind(project_id)
        .bind(epic)
        .bind(feature_name)
        .bind(scenario_ids)
        .fetch_all(&mut **tx)
        .await
    }

    /// List epic names of a project in alphabetical order.
    pub async fn list_epics(
        pool: &PgPool,
        project_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT name FROM epics WHERE project_id = $1 ORDER BY name LIMIT $2 OFFSET $3",
        )
        .bind(project_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// List features of a project, optionally restricted to one epic.
    pub async fn list_features(
        pool: &PgPool,
        project_id: DbId,
        epic: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FeatureEntry>, sqlx::Error> {
        sqlx::query_as::<_, FeatureEntry>(
            "SELECT e.name AS epic, f.name, f.filename, f.tags
             FROM features f
             JOIN epics e ON e.id = f.epic_id
             WHERE f.project_id = $1 AND ($2::TEXT IS NULL OR e.name = $2)
             ORDER BY e.name, f.name
             LIMIT $3 OFFSET $4",
        )
        .bind(project_id)
        .bind(epic)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// List scenarios of a project, optionally restricted to an epic and/or
    /// feature. Returns the page and the total number of matching scenarios.
    pub async fn list_scenarios(
        pool: &PgPool,
        project_id: DbId,
        epic: Option<&str>,
        feature_name: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ScenarioEntry>, i64), sqlx::Error> {
        const FILTER: &str = "FROM scenarios s
             JOIN features f ON f.id = s.feature_id
             JOIN epics e ON e.id = f.epic_id
             WHERE s.project_id = $1
               AND ($2::TEXT IS NULL OR e.name = $2)
               AND ($3::TEXT IS NULL OR f.name = $3)";

        let query = format!(
            "SELECT {ENTRY_COLUMNS} {FILTER} ORDER BY e.name, f.name, s.scenario_id LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query_as::<_, ScenarioEntry>(&query)
            .bind(project_id)
            .bind(epic)
            .bind(feature_name)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) {FILTER}");
        let total = sqlx::query_scalar::<_, i64>(&count_query)
            .bind(project_id)
            .bind(epic)
            .bind(feature_name)
            .fetch_one(pool)
            .await?;

        Ok((rows, total))
    }
}
