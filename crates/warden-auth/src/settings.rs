//! Process-wide authentication settings

use crate::error::AuthError;

/// Signing secret and token lifetime, fixed for the life of the process
#[derive(Clone)]
pub struct AuthSettings {
    signing_secret: String,
    token_ttl_minutes: u32,
}

impl AuthSettings {
    /// Build settings, rejecting an empty secret or a zero TTL
    pub fn new(signing_secret: impl Into<String>, token_ttl_minutes: u32) -> Result<Self, AuthError> {
        let signing_secret = signing_secret.into();

        if signing_secret.trim().is_empty() {
            return Err(AuthError::Signing(
                "signing secret must not be empty".to_string(),
            ));
        }
        if token_ttl_minutes == 0 {
            return Err(AuthError::InvalidConfig(
                "token TTL must be at least one minute".to_string(),
            ));
        }

        Ok(Self {
            signing_secret,
            token_ttl_minutes,
        })
    }

    pub fn signing_secret(&self) -> &[u8] {
        self.signing_secret.as_bytes()
    }

    pub fn token_ttl_minutes(&self) -> u32 {
        self.token_ttl_minutes
    }

    /// Token lifetime in seconds
    pub fn token_ttl_secs(&self) -> i64 {
        i64::from(self.token_ttl_minutes) * 60
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("signing_secret", &"<redacted>")
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .finish()
    }
}
