//! Ordered, append-only schema migrations.
//!
//! Each entry in [`MIGRATIONS`] is identified by its 1-based position in the
//! list. The highest position applied so far (the *marker*) is persisted in
//! the `schema_operations` table, one row per applied step. On startup every
//! entry past the marker runs in list order, each inside its own
//! transaction together with the marker row that records it.
//!
//! Entries are never edited, removed, or reordered once released: new
//! schema changes are appended to the end of the list.

use sqlx::{PgConnection, PgPool};

/// Operation type under which schema steps are recorded.
pub const OP_TYPE_DATABASE: &str = "database";

/// Advisory lock key serialising concurrent migration runs (`"qadashdb"`).
const MIGRATION_LOCK_KEY: i64 = 0x7161_6461_7368_6462;

/// A single schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Human-readable summary, recorded alongside the marker.
    pub description: &'static str,
    /// One or more SQL statements, executed as a single batch.
    pub statement: &'static str,
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    /// Marker value before this run.
    pub previous_marker: i32,
    /// Marker value after this run.
    pub current_marker: i32,
    /// Number of steps executed by this run.
    pub applied: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// A step's statement failed. Steps before it remain applied.
    #[error("Migration {order} ({description}) failed: {source}")]
    Step {
        order: i32,
        description: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Bookkeeping (bootstrap, locking, marker reads/writes) failed.
    #[error("Migration bookkeeping failed: {0}")]
    Database(#[from] sqlx::Error),
}

const BOOTSTRAP: &str = "
CREATE TABLE IF NOT EXISTS schema_operations (
    id          BIGSERIAL PRIMARY KEY,
    op_type     TEXT NOT NULL,
    op_order    INTEGER NOT NULL,
    description TEXT NOT NULL,
    applied_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_schema_operations_type_order UNIQUE (op_type, op_order)
);
INSERT INTO schema_operations (op_type, op_order, description)
VALUES ('database', 0, 'bootstrap')
ON CONFLICT ON CONSTRAINT uq_schema_operations_type_order DO NOTHING;
";

/// The schema, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        description: "create set_updated_at trigger function",
        statement: "
CREATE OR REPLACE FUNCTION set_updated_at() RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = NOW();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;
",
    },
    Migration {
        description: "create projects table",
        statement: "
CREATE TABLE IF NOT EXISTS projects (
    id         BIGSERIAL PRIMARY KEY,
    name       TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_projects_name UNIQUE (name)
);
DROP TRIGGER IF EXISTS trg_projects_updated_at ON projects;
CREATE TRIGGER trg_projects_updated_at BEFORE UPDATE ON projects
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
",
    },
    Migration {
        description: "create versions table",
        statement: "
CREATE TABLE IF NOT EXISTS versions (
    id           BIGSERIAL PRIMARY KEY,
    project_id   BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    version      TEXT NOT NULL,
    status       TEXT NOT NULL DEFAULT 'recorded',
    started      TIMESTAMPTZ,
    end_forecast TIMESTAMPTZ,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_versions_project_version UNIQUE (project_id, version)
);
DROP TRIGGER IF EXISTS trg_versions_updated_at ON versions;
CREATE TRIGGER trg_versions_updated_at BEFORE UPDATE ON versions
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
",
    },
    Migration {
        description: "create tickets table",
        statement: "
CREATE TABLE IF NOT EXISTS tickets (
    id          BIGSERIAL PRIMARY KEY,
    project_id  BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    version_id  BIGINT NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    reference   TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL DEFAULT 'open',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_tickets_version_reference UNIQUE (version_id, reference)
);
DROP TRIGGER IF EXISTS trg_tickets_updated_at ON tickets;
CREATE TRIGGER trg_tickets_updated_at BEFORE UPDATE ON tickets
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
",
    },
    Migration {
        description: "create epics table",
        statement: "
CREATE TABLE IF NOT EXISTS epics (
    id         BIGSERIAL PRIMARY KEY,
    project_id BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_epics_project_name UNIQUE (project_id, name)
);
DROP TRIGGER IF EXISTS trg_epics_updated_at ON epics;
CREATE TRIGGER trg_epics_updated_at BEFORE UPDATE ON epics
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
",
    },
    Migration {
        description: "create features table",
        statement: "
CREATE TABLE IF NOT EXISTS features (
    id          BIGSERIAL PRIMARY KEY,
    project_id  BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    epic_id     BIGINT NOT NULL REFERENCES epics(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    filename    TEXT,
    description TEXT NOT NULL DEFAULT '',
    tags        TEXT NOT NULL DEFAULT '',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_features_epic_name UNIQUE (epic_id, name)
);
DROP TRIGGER IF EXISTS trg_features_updated_at ON features;
CREATE TRIGGER trg_features_updated_at BEFORE UPDATE ON features
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
",
    },
    Migration {
        description: "create scenarios table",
        statement: "
CREATE TABLE IF NOT EXISTS scenarios (
    id          BIGSERIAL PRIMARY KEY,
    project_id  BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    feature_id  BIGINT NOT NULL REFERENCES features(id) ON DELETE CASCADE,
    scenario_id TEXT NOT NULL,
    name        TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    steps       TEXT NOT NULL DEFAULT '',
    tags        TEXT NOT NULL DEFAULT '',
    is_outline  BOOLEAN NOT NULL DEFAULT false,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_scenarios_feature_scenario UNIQUE (feature_id, scenario_id)
);
DROP TRIGGER IF EXISTS trg_scenarios_updated_at ON scenarios;
CREATE TRIGGER trg_scenarios_updated_at BEFORE UPDATE ON scenarios
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
",
    },
    Migration {
        description: "create campaigns table",
        statement: "
CREATE TABLE IF NOT EXISTS campaigns (
    id          BIGSERIAL PRIMARY KEY,
    project_id  BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    version_id  BIGINT NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    occurrence  INTEGER NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL DEFAULT 'recorded',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_campaigns_version_occurrence UNIQUE (project_id, version_id, occurrence),
    CONSTRAINT ck_campaigns_occurrence_positive CHECK (occurrence > 0)
);
DROP TRIGGER IF EXISTS trg_campaigns_updated_at ON campaigns;
CREATE TRIGGER trg_campaigns_updated_at BEFORE UPDATE ON campaigns
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
",
    },
    Migration {
        description: "create campaign_tickets table",
        statement: "
CREATE TABLE IF NOT EXISTS campaign_tickets (
    id          BIGSERIAL PRIMARY KEY,
    campaign_id BIGINT NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
    ticket_id   BIGINT NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
    ticket_name TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_campaign_tickets_campaign_ticket UNIQUE (campaign_id, ticket_name)
);
DROP TRIGGER IF EXISTS trg_campaign_tickets_updated_at ON campaign_tickets;
CREATE TRIGGER trg_campaign_tickets_updated_at BEFORE UPDATE ON campaign_tickets
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
",
    },
    Migration {
        description: "rename campaign_tickets.ticket_name to ticket_reference",
        statement: "ALTER TABLE campaign_tickets RENAME COLUMN ticket_name TO ticket_reference;",
    },
    Migration {
        description: "create campaign_ticket_scenarios table",
        statement: "
CREATE TABLE IF NOT EXISTS campaign_ticket_scenarios (
    id                 BIGSERIAL PRIMARY KEY,
    campaign_ticket_id BIGINT NOT NULL REFERENCES campaign_tickets(id) ON DELETE CASCADE,
    scenario_id        BIGINT NOT NULL REFERENCES scenarios(id) ON DELETE CASCADE,
    created_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_campaign_ticket_scenarios_ticket_scenario UNIQUE (campaign_ticket_id, scenario_id)
);
DROP TRIGGER IF EXISTS trg_campaign_ticket_scenarios_updated_at ON campaign_ticket_scenarios;
CREATE TRIGGER trg_campaign_ticket_scenarios_updated_at BEFORE UPDATE ON campaign_ticket_scenarios
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
",
    },
    Migration {
        description: "add status to campaign_ticket_scenarios",
        statement: "
ALTER TABLE campaign_ticket_scenarios
    ADD COLUMN IF NOT EXISTS status TEXT NOT NULL DEFAULT 'recorded';
",
    },
    Migration {
        description: "create users table",
        statement: "
CREATE TABLE IF NOT EXISTS users (
    id            BIGSERIAL PRIMARY KEY,
    username      TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL DEFAULT 'user',
    is_active     BOOLEAN NOT NULL DEFAULT true,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_users_username UNIQUE (username),
    CONSTRAINT ck_users_role CHECK (role IN ('admin', 'user'))
);
DROP TRIGGER IF EXISTS trg_users_updated_at ON users;
CREATE TRIGGER trg_users_updated_at BEFORE UPDATE ON users
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
",
    },
    Migration {
        description: "create user_sessions table",
        statement: "
CREATE TABLE IF NOT EXISTS user_sessions (
    id            BIGSERIAL PRIMARY KEY,
    user_id       BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token_id_hash TEXT NOT NULL,
    expires_at    TIMESTAMPTZ NOT NULL,
    is_revoked    BOOLEAN NOT NULL DEFAULT false,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_user_sessions_token_id_hash UNIQUE (token_id_hash)
);
DROP TRIGGER IF EXISTS trg_user_sessions_updated_at ON user_sessions;
CREATE TRIGGER trg_user_sessions_updated_at BEFORE UPDATE ON user_sessions
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
",
    },
    Migration {
        description: "index foreign keys",
        statement: "
CREATE INDEX IF NOT EXISTS idx_versions_project_id ON versions (project_id);
CREATE INDEX IF NOT EXISTS idx_tickets_project_id ON tickets (project_id);
CREATE INDEX IF NOT EXISTS idx_features_project_id ON features (project_id);
CREATE INDEX IF NOT EXISTS idx_scenarios_project_id ON scenarios (project_id);
CREATE INDEX IF NOT EXISTS idx_campaigns_version_id ON campaigns (version_id);
CREATE INDEX IF NOT EXISTS idx_campaign_tickets_ticket_id ON campaign_tickets (ticket_id);
CREATE INDEX IF NOT EXISTS idx_campaign_ticket_scenarios_scenario_id
    ON campaign_ticket_scenarios (scenario_id);
CREATE INDEX IF NOT EXISTS idx_user_sessions_user_id ON user_sessions (user_id);
",
    },
    Migration {
        description: "create bugs table",
        statement: "
CREATE TABLE IF NOT EXISTS bugs (
    id          BIGSERIAL PRIMARY KEY,
    project_id  BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    version_id  BIGINT NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    url         TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    criticality TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'open',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_bugs_version_title UNIQUE (project_id, version_id, title),
    CONSTRAINT ck_bugs_criticality CHECK (criticality IN ('blocking', 'major', 'minor')),
    CONSTRAINT ck_bugs_status
        CHECK (status IN ('open', 'fix ready', 'closed', 'closed not a defect'))
);
DROP TRIGGER IF EXISTS trg_bugs_updated_at ON bugs;
CREATE TRIGGER trg_bugs_updated_at BEFORE UPDATE ON bugs
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
CREATE INDEX IF NOT EXISTS idx_bugs_version_id ON bugs (version_id);
",
    },
    Migration {
        description: "create bug_scenarios table",
        statement: "
CREATE TABLE IF NOT EXISTS bug_scenarios (
    id                          BIGSERIAL PRIMARY KEY,
    bug_id                      BIGINT NOT NULL REFERENCES bugs(id) ON DELETE CASCADE,
    campaign_ticket_scenario_id BIGINT NOT NULL
        REFERENCES campaign_ticket_scenarios(id) ON DELETE CASCADE,
    created_at                  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at                  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_bug_scenarios_bug_scenario UNIQUE (bug_id, campaign_ticket_scenario_id)
);
DROP TRIGGER IF EXISTS trg_bug_scenarios_updated_at ON bug_scenarios;
CREATE TRIGGER trg_bug_scenarios_updated_at BEFORE UPDATE ON bug_scenarios
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
CREATE INDEX IF NOT EXISTS idx_bug_scenarios_scenario
    ON bug_scenarios (campaign_ticket_scenario_id);
",
    },
];

/// Apply every pending entry of [`MIGRATIONS`].
pub async fn run_migrations(pool: &PgPool) -> Result<MigrationReport, MigrationError> {
    apply_migrations(pool, MIGRATIONS).await
}

/// Apply every entry of `migrations` whose position is past the marker.
///
/// Safe to call concurrently from several processes: each step takes a
/// transaction-scoped advisory lock and re-reads the marker before running.
/// A failing step is rolled back and reported; earlier steps stay applied
/// and the next run resumes at the failed step.
pub async fn apply_migrations(
    pool: &PgPool,
    migrations: &[Migration],
) -> Result<MigrationReport, MigrationError> {
    bootstrap(pool).await?;

    let previous_marker = current_marker(pool).await?;
    let known = i32::try_from(migrations.len()).unwrap_or(i32::MAX);
    if previous_marker > known {
        tracing::warn!(
            marker = previous_marker,
            known,
            "Database schema is ahead of this build's migration list"
        );
    }

    let mut applied = 0;
    let mut marker = previous_marker;

    for (index, migration) in migrations.iter().enumerate() {
        let order = i32::try_from(index + 1).unwrap_or(i32::MAX);
        if order <= marker {
            continue;
        }

        let mut tx = pool.begin().await?;
        lock(&mut tx).await?;

        // Another instance may have applied this step while we waited.
        let locked_marker = read_marker(&mut tx).await?;
        if order <= locked_marker {
            tx.rollback().await?;
            marker = locked_marker;
            continue;
        }
        if order != locked_marker + 1 {
            tx.rollback().await?;
            return Err(MigrationError::Step {
                order,
                description: migration.description,
                source: sqlx::Error::Protocol(format!(
                    "marker is {locked_marker}, refusing to skip to step {order}"
                )),
            });
        }

        if let Err(source) = sqlx::raw_sql(migration.statement).execute(&mut *tx).await {
            tracing::error!(order, description = migration.description, error = %source, "Migration failed");
            tx.rollback().await?;
            return Err(MigrationError::Step {
                order,
                description: migration.description,
                source,
            });
        }

        sqlx::query(
            "INSERT INTO schema_operations (op_type, op_order, description) VALUES ($1, $2, $3)",
        )
        .bind(OP_TYPE_DATABASE)
        .bind(order)
        .bind(migration.description)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(order, description = migration.description, "Applied migration");

        marker = order;
        applied += 1;
    }

    Ok(MigrationReport {
        previous_marker,
        current_marker: marker,
        applied,
    })
}

/// Read the persisted marker (0 when only the bootstrap has run).
pub async fn current_marker(pool: &PgPool) -> Result<i32, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    read_marker(&mut conn).await
}

async fn bootstrap(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    lock(&mut tx).await?;
    sqlx::raw_sql(BOOTSTRAP).execute(&mut *tx).await?;
    tx.commit().await
}

async fn lock(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(conn)
        .await?;
    Ok(())
}

async fn read_marker(conn: &mut PgConnection) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(op_order), 0) FROM schema_operations WHERE op_type = $1",
    )
    .bind(OP_TYPE_DATABASE)
    .fetch_one(conn)
    .await
}
