//! Domain rules for the qadash test-campaign backend.
//!
//! Everything here is pure: no database access and no HTTP types. The `db`
//! and `api` crates call into these modules to validate input before it
//! reaches the store.

pub mod bug_status;
pub mod campaign_status;
pub mod error;
pub mod naming;
pub mod repository_csv;
pub mod roles;
pub mod ticket_status;
pub mod types;
pub mod version_status;
