//! PostgreSQL access layer: pool setup, schema migrations, models,
//! repositories, and the campaign and bug workflow services.

use sqlx::postgres::PgPoolOptions;

pub mod bug_workflow;
pub mod migrations;
pub mod models;
pub mod repositories;
pub mod workflow;

pub use migrations::{run_migrations, MigrationError, MigrationReport};

pub type DbPool = sqlx::PgPool;

/// Default maximum pool size when `DB_MAX_CONNECTIONS` is not configured.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
