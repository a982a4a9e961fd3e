use axum::routing::get;
use axum::Router;

use crate::handlers::health;
use crate::middleware::metrics::serve_metrics;
use crate::state::AppState;

/// Mount health and metrics routes (root-level, NOT under `/api/v1`).
///
/// ```text
/// GET /health   -> health snapshot (public)
/// GET /metrics  -> Prometheus exposition (public)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(serve_metrics))
}
