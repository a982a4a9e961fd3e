//! Request middleware and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a bearer token
//!   or the `access_token` cookie, and checks the session is not revoked.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.
//! - [`rbac::RequireAuth`] -- Requires any authenticated user.
//! - [`metrics`] -- Per-request Prometheus counters and the `/metrics` renderer.

pub mod auth;
pub mod metrics;
pub mod rbac;
