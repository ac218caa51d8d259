//! `UserStore` backed by the users table

use async_trait::async_trait;
use warden_auth::{AuthError, StoredIdentity, UserStore};

use crate::repository::Database;

#[async_trait]
impl UserStore for Database {
    async fn find_by_username(&self, username: &str) -> Result<Option<StoredIdentity>, AuthError> {
        let user = self
            .get_user_by_username(username)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(user.map(|u| u.identity()))
    }
}
