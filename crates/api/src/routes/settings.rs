//! Route definitions for the `/settings` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::project;
use crate::state::AppState;

/// Routes mounted at `/settings`.
///
/// ```text
/// GET  /projects  -> list_names
/// POST /projects  -> create (admin only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/projects", get(project::list_names).post(project::create))
}
