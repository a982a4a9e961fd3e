//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- JWT access-token generation and validation, plus the token
//!   id hash used to key revocable sessions.

pub mod jwt;
pub mod password;
