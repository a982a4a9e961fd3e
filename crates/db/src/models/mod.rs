//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts
//! - An update DTO (all `Option` fields) for patches, where the entity is mutable

pub mod bug;
pub mod campaign;
pub mod project;
pub mod repository;
pub mod session;
pub mod ticket;
pub mod user;
pub mod version;
