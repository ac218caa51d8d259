//! User lookup boundary

use async_trait::async_trait;

use crate::error::AuthError;

/// The slice of a persisted user record that authentication reads
#[derive(Debug, Clone)]
pub struct StoredIdentity {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
}

/// Read access to user records.
///
/// Implementations report a missing user as `Ok(None)` and reserve `Err`
/// for failures of the store itself.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<StoredIdentity>, AuthError>;
}
