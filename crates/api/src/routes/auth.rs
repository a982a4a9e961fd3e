//! Route definitions for the `/token` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Token routes, merged at the API root.
///
/// ```text
/// POST   /token  -> issue_token (public, form-encoded)
/// DELETE /token  -> revoke_token (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/token", post(auth::issue_token).delete(auth::revoke_token))
}
