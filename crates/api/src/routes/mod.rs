pub mod auth;
pub mod health;
pub mod project;
pub mod settings;
pub mod user;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /token                                                    issue (public), revoke
///
/// /users                                                    create or update (admin only)
/// /users/me                                                 change own password
///
/// /settings/projects                                        list names, create (admin only)
///
/// /projects                                                 list with version bucket counts
/// /projects/{name}                                          get (?sections=)
/// /projects/{name}/versions                                 create (admin only)
/// /projects/{name}/versions/{version}                       get, update
/// /projects/{name}/versions/{version}/tickets               list, create (admin only)
/// /projects/{name}/versions/{version}/tickets/{reference}   get, update
/// /projects/{name}/versions/{version}/bugs                  list bugs of the version
///
/// /projects/{name}/repository                               import CSV (multipart), list
/// /projects/{name}/epics                                    list epics
/// /projects/{name}/epics/{epic}/features                    list features
///
/// /projects/{name}/bugs                                     list, file
/// /projects/{name}/bugs/{id}                                get, update
///
/// /projects/{name}/campaigns                                list, create (admin only)
/// /projects/{name}/campaigns/{version}/{occurrence}         get, attach ticket (admin only)
///     /tickets                                              aggregated view
///     /tickets/{reference}                                  scenarios map, add existing
///     /tickets/{reference}/scenarios/{internal_id}          get
///     /tickets/{reference}/scenarios/{internal_id}/status   update (?new_status=)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Token issue and revocation.
        .merge(auth::router())
        // Accounts.
        .nest("/users", user::router())
        // Project administration.
        .nest("/settings", settings::router())
        // Projects and everything scoped to one.
        .nest("/projects", project::router())
}
