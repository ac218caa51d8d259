//! Authentication error types

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Identity not found")]
    IdentityNotFound,

    #[error("Invalid credentials")]
    InvalidCredential,

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Missing token")]
    MissingToken,

    #[error("Invalid authorization header format")]
    MalformedAuthHeader,

    #[error("Malformed token")]
    MalformedToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Admin privilege required")]
    InsufficientPrivilege,

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Invalid auth configuration: {0}")]
    InvalidConfig(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("User store error: {0}")]
    Store(String),
}

impl AuthError {
    /// HTTP status this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            AuthError::IdentityNotFound
            | AuthError::InvalidCredential
            | AuthError::MissingToken
            | AuthError::MalformedAuthHeader
            | AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::AccountDisabled | AuthError::InsufficientPrivilege => StatusCode::FORBIDDEN,
            AuthError::Signing(_)
            | AuthError::InvalidConfig(_)
            | AuthError::PasswordHash(_)
            | AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller.
    ///
    /// Unknown usernames and wrong passwords share one message so responses
    /// cannot be used to enumerate accounts.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::MalformedInput(msg) => msg.clone(),
            AuthError::IdentityNotFound | AuthError::InvalidCredential => {
                "invalid credentials".to_string()
            }
            AuthError::AccountDisabled => "account disabled".to_string(),
            AuthError::MissingToken => "missing token".to_string(),
            AuthError::MalformedAuthHeader => "malformed authorization header".to_string(),
            AuthError::MalformedToken => "malformed token".to_string(),
            AuthError::InvalidSignature => "invalid token signature".to_string(),
            AuthError::TokenExpired => "token expired".to_string(),
            AuthError::InsufficientPrivilege => "admin privilege required".to_string(),
            AuthError::Signing(_)
            | AuthError::InvalidConfig(_)
            | AuthError::PasswordHash(_)
            | AuthError::Store(_) => "internal error".to_string(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidKeyFormat => AuthError::Signing(err.to_string()),
            _ => AuthError::MalformedToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = axum::Json(json!({
            "code": status.as_u16(),
            "message": self.public_message(),
        }));

        (status, body).into_response()
    }
}
