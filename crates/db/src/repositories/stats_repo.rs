//! Read-only PostgreSQL server statistics for the health endpoint.

use sqlx::PgPool;

/// Queries against PostgreSQL system functions and views.
pub struct StatsRepo;

impl StatsRepo {
    /// Whether the server is a standby replaying WAL.
    pub async fn is_in_recovery(pool: &PgPool) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT pg_is_in_recovery()")
            .fetch_one(pool)
            .await
    }

    /// Number of backends connected to the current database.
    pub async fn connection_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM pg_stat_activity WHERE datname = current_database()",
        )
        .fetch_one(pool)
        .await
    }
}
