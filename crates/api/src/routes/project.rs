//! Route definitions for the `/projects` resource.
//!
//! Versions, tickets, the scenario repository and campaigns all live under
//! `/projects/{name}/...`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{bug, campaign, project, repository, ticket, version};
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET  /                                              -> project::list
/// GET  /{name}                                        -> project::get
///
/// POST /{name}/versions                               -> version::create
/// GET  /{name}/versions/{version}                     -> version::get
/// PUT  /{name}/versions/{version}                     -> version::update
/// GET  /{name}/versions/{version}/tickets             -> ticket::list
/// POST /{name}/versions/{version}/tickets             -> ticket::create
/// GET  /{name}/versions/{version}/tickets/{reference} -> ticket::get
/// PUT  /{name}/versions/{version}/tickets/{reference} -> ticket::update
/// GET  /{name}/versions/{version}/bugs                -> bug::list_for_version
///
/// POST /{name}/repository                             -> repository::upload (multipart)
/// GET  /{name}/repository                             -> repository::list
/// GET  /{name}/epics                                  -> repository::list_epics
/// GET  /{name}/epics/{epic}/features                  -> repository::list_epic_features
///
/// GET  /{name}/bugs                                   -> bug::list
/// POST /{name}/bugs                                   -> bug::create
/// GET  /{name}/bugs/{id}                              -> bug::get
/// PUT  /{name}/bugs/{id}                              -> bug::update
///
/// GET  /{name}/campaigns                              -> campaign::list
/// POST /{name}/campaigns                              -> campaign::create
/// ```
///
/// Campaign occurrences, relative to `/{name}/campaigns/{version}/{occurrence}`:
///
/// ```text
/// GET  /                                              -> campaign::get
/// PUT  /                                              -> campaign::attach
/// GET  /tickets                                       -> campaign::tickets
/// GET  /tickets/{reference}                           -> campaign::ticket_scenarios
/// PUT  /tickets/{reference}                           -> campaign::add_scenarios
/// GET  /tickets/{reference}/scenarios/{id}            -> campaign::scenario
/// PUT  /tickets/{reference}/scenarios/{id}/status     -> campaign::update_status
/// ```
pub fn router() -> Router<AppState> {
    let version_routes = Router::new()
        .route("/", post(version::create))
        .route("/{version}", get(version::get).put(version::update))
        .route("/{version}/tickets", get(ticket::list).post(ticket::create))
        .route(
            "/{version}/tickets/{reference}",
            get(ticket::get).put(ticket::update),
        )
        .route("/{version}/bugs", get(bug::list_for_version));

    let campaign_routes = Router::new()
        .route("/", get(campaign::list).post(campaign::create))
        .route(
            "/{version}/{occurrence}",
            get(campaign::get).put(campaign::attach),
        )
        .route("/{version}/{occurrence}/tickets", get(campaign::tickets))
        .route(
            "/{version}/{occurrence}/tickets/{reference}",
            get(campaign::ticket_scenarios).put(campaign::add_scenarios),
        )
        .route(
            "/{version}/{occurrence}/tickets/{reference}/scenarios/{internal_id}",
            get(campaign::scenario),
        )
        .route(
            "/{version}/{occurrence}/tickets/{reference}/scenarios/{internal_id}/status",
            put(campaign::update_status),
        );

    Router::new()
        .route("/", get(project::list))
        .route("/{name}", get(project::get))
        .route(
            "/{name}/repository",
            get(repository::list).post(repository::upload),
        )
        .route("/{name}/epics", get(repository::list_epics))
        .route(
            "/{name}/epics/{epic}/features",
            get(repository::list_epic_features),
        )
        .route("/{name}/bugs", get(bug::list).post(bug::create))
        .route("/{name}/bugs/{id}", get(bug::get).put(bug::update))
        .nest("/{name}/versions", version_routes)
        .nest("/{name}/campaigns", campaign_routes)
}
