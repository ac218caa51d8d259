//! Warden REST API
//!
//! This crate provides the Axum-based HTTP API: the token endpoint, the
//! admin-only user management API, the book catalogue and the authenticated
//! profile endpoint.

pub mod error;
pub mod routes;
pub mod state;
pub mod validation;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
