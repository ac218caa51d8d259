//! Warden Database Layer
//!
//! This crate persists users and their books in SQLite via sqlx and exposes
//! users to the authentication core through [`warden_auth::UserStore`].

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::Database;

/// Re-export sqlx types for convenience
pub use sqlx::SqlitePool;
