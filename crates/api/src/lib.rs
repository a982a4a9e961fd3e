//! qadash API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! metrics) so integration tests and the binary entrypoint share them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod router;
pub mod routes;
pub mod state;
