use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: qadash_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Renders the process-wide Prometheus registry for `/metrics`.
    pub metrics: PrometheusHandle,
}
