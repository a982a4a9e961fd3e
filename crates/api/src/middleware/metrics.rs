//! Request metrics middleware and the Prometheus `/metrics` endpoint.
//!
//! Records, per method, matched route and status code:
//! - `http_requests_total` -- request counter
//! - `http_request_duration_seconds` -- latency summary
//!
//! Database pool gauges (`db_pool_connections{state}`) are sampled when
//! `/metrics` is scraped.

use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const DB_POOL_CONNECTIONS: &str = "db_pool_connections";

/// Route label for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

/// Requests slower than this are logged at `warn`.
const SLOW_REQUEST_SECS: f64 = 1.0;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the process-wide Prometheus recorder, once.
///
/// Later calls return the handle of the first installation, so tests can
/// build as many routers as they like.
///
/// # Panics
///
/// Panics if another global metrics recorder was installed first.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .unwrap_or_else(|e| panic!("failed to install prometheus recorder: {e}"));

            describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests");
            describe_histogram!(HTTP_REQUEST_DURATION, "Duration of HTTP requests in seconds");
            describe_gauge!(DB_POOL_CONNECTIONS, "Database pool connections by state");

            tracing::info!("Prometheus metrics recorder initialized");
            handle
        })
        .clone()
}

/// Label for the route a request matched, e.g. `/api/v1/projects/{name}`.
fn route_label(request: &Request) -> String {
    request.extensions().get::<MatchedPath>().map_or_else(
        || UNMATCHED_ROUTE.to_string(),
        |path| path.as_str().to_string(),
    )
}

/// Middleware counting requests and timing them.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = route_label(&request);
    let method = request.method().to_string();

    let response = next.run(request).await;

    let elapsed = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    let labels = [
        ("method", method.clone()),
        ("route", route.clone()),
        ("status", status.clone()),
    ];
    counter!(HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(HTTP_REQUEST_DURATION, &labels).record(elapsed);

    if elapsed > SLOW_REQUEST_SECS {
        tracing::warn!(%route, %method, %status, elapsed_secs = elapsed, "Slow request");
    }

    response
}

/// GET /metrics -- Prometheus text exposition, unauthenticated.
pub async fn serve_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let total = state.pool.size() as f64;
    let idle = state.pool.num_idle() as f64;
    gauge!(DB_POOL_CONNECTIONS, "state" => "idle").set(idle);
    gauge!(DB_POOL_CONNECTIONS, "state" => "active").set((total - idle).max(0.0));

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn unmatched_requests_get_a_fixed_label() {
        let request = Request::builder().uri("/nowhere").body(Body::empty()).unwrap();
        assert_eq!(route_label(&request), UNMATCHED_ROUTE);
    }

    #[tokio::test]
    async fn requests_are_counted_by_route_template() {
        let handle = init_metrics();
        let app = Router::new()
            .route("/widgets/{id}", get(|| async { StatusCode::ACCEPTED }))
            .layer(axum::middleware::from_fn(track_requests));

        let request = Request::builder().uri("/widgets/17").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let rendered = handle.render();
        let line = rendered
            .lines()
            .find(|l| l.starts_with(HTTP_REQUESTS_TOTAL) && l.contains("route=\"/widgets/{id}\""))
            .expect("request counter line");
        assert!(line.contains("status=\"202\""));
        assert!(line.contains("method=\"GET\""));
        assert!(!rendered.contains("/widgets/17"));
    }
}
