//! Warden Authentication and Authorization
//!
//! This crate verifies credentials, issues signed time-bounded access
//! tokens, and gates requests by validating those tokens and checking the
//! admin claim.

pub mod clock;
pub mod error;
pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;
pub mod settings;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AuthError;
pub use gate::{AccessGate, GateDecision, Rejection, RouteRequirement};
pub use jwt::{AccessClaims, SignedToken, TokenIssuer, TokenValidator};
pub use middleware::{ActingUser, require_admin, require_auth};
pub use password::{hash_password, verify_password};
pub use service::{AuthService, IssuedToken};
pub use settings::AuthSettings;
pub use store::{StoredIdentity, UserStore};
