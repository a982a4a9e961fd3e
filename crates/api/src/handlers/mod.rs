pub mod auth;
pub mod bug;
pub mod campaign;
pub mod health;
pub mod project;
pub mod repository;
pub mod ticket;
pub mod user;
pub mod version;
