//! Route definitions for the `/users` resource.

use axum::routing::{post, put};
use axum::Router;

use crate::handlers::user;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// POST /     -> upsert (admin only)
/// PUT  /me   -> update_me
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(user::upsert))
        .route("/me", put(user::update_me))
}
