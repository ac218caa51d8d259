//! Credential exchange: username and password in, access token out

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::jwt::{AccessClaims, TokenIssuer};
use crate::password::verify_password;
use crate::store::UserStore;

/// Valid Argon2id hash that no password matches. Verified against when the
/// username is unknown so both failure paths do the same work.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$dGltaW5nX2F0dGFja19wcmV2ZW50aW9u$K8rI5T7VdQ8xkO0GqK5K2w";

/// Token handed back after a successful login
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in_minutes: u32,
    pub claims: AccessClaims,
}

/// Authenticates users against a [`UserStore`] and issues tokens
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    issuer: TokenIssuer,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, issuer: TokenIssuer) -> Self {
        Self { store, issuer }
    }

    pub fn token_ttl_minutes(&self) -> u32 {
        self.issuer.token_ttl_minutes()
    }

    /// Exchange credentials for an access token
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        if username.is_empty() {
            return Err(AuthError::MalformedInput("username is required".to_string()));
        }
        if password.is_empty() {
            return Err(AuthError::MalformedInput("password is required".to_string()));
        }

        debug!("Login attempt for user: {}", username);

        let Some(identity) = self.store.find_by_username(username).await? else {
            let _ = verify_password(password, DUMMY_HASH);
            debug!("Unknown username: {}", username);
            return Err(AuthError::IdentityNotFound);
        };

        if !verify_password(password, &identity.password_hash) {
            debug!("Wrong password for user: {}", username);
            return Err(AuthError::InvalidCredential);
        }

        if !identity.is_active {
            warn!("Login attempt for disabled account: {}", username);
            return Err(AuthError::AccountDisabled);
        }

        let signed = self.issuer.issue(identity.id, identity.is_admin)?;

        info!("User {} logged in successfully", identity.username);

        Ok(IssuedToken {
            access_token: signed.token,
            expires_in_minutes: self.issuer.token_ttl_minutes(),
            claims: signed.claims,
        })
    }
}
