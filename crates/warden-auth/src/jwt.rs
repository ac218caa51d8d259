//! JWT access token issuance and validation

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::AuthError;
use crate::settings::AuthSettings;

/// Claims carried by an access token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// ID of the user the token was issued to
    #[serde(rename = "user_id")]
    pub subject_id: i64,
    /// Whether the user held the admin role at issuance
    #[serde(rename = "admin")]
    pub is_admin: bool,
    /// Issued at (Unix timestamp)
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Expiration time (Unix timestamp)
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

/// A signed token together with the claims it encodes
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: AccessClaims,
}

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.token
    }
}

/// Builds and signs access tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    ttl_secs: i64,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(settings: &AuthSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: &AuthSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.signing_secret()),
            ttl_secs: settings.token_ttl_secs(),
            clock,
        }
    }

    /// Lifetime of every token this issuer signs
    pub fn token_ttl_minutes(&self) -> u32 {
        u32::try_from(self.ttl_secs / 60).unwrap_or(u32::MAX)
    }

    /// Issue a token for a user, expiring one TTL from now
    pub fn issue(&self, subject_id: i64, is_admin: bool) -> Result<SignedToken, AuthError> {
        let now = self.clock.now();

        let claims = AccessClaims {
            subject_id,
            is_admin,
            issued_at: now,
            expires_at: now + self.ttl_secs,
        };

        debug!("Issuing token for user {} (admin: {})", subject_id, is_admin);

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(SignedToken { token, claims })
    }
}

/// Verifies access tokens and extracts their claims
#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
    pub fn new(settings: &AuthSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: &AuthSettings, clock: Arc<dyn Clock>) -> Self {
        // Expiry is checked against our own clock after the signature passes.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(settings.signing_secret()),
            validation,
            clock,
        }
    }

    /// Validate a token and return its claims.
    ///
    /// Checks run in order: structure, signature, claims shape, expiry. A
    /// forged token is therefore reported as a bad signature even when its
    /// claimed expiry has already passed.
    pub fn validate(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)?;
        let claims = token_data.claims;

        if self.clock.now() >= claims.expires_at {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }
}
