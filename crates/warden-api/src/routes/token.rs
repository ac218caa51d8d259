//! Access token endpoint

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use warden_auth::AuthError;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{MAX_PASSWORD_LENGTH, MAX_USERNAME_LENGTH};

use super::types::{TokenRequest, TokenResponse};

/// POST /api/v1/token/new
async fn new_access_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if request.username.len() > MAX_USERNAME_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Username exceeds maximum length of {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    if request.password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }

    match state.auth.authenticate(&request.username, &request.password).await {
        Ok(issued) => {
            metrics::counter!("warden_token_requests_total", "outcome" => "issued").increment(1);

            Ok(Json(TokenResponse {
                msg: format!(
                    "Token will be expired within {} minutes",
                    issued.expires_in_minutes
                ),
                access_token: issued.access_token,
                expires_in_minutes: issued.expires_in_minutes,
            }))
        }
        Err(e) => {
            metrics::counter!("warden_token_requests_total", "outcome" => outcome_label(&e))
                .increment(1);
            Err(e.into())
        }
    }
}

fn outcome_label(err: &AuthError) -> &'static str {
    match err {
        AuthError::MalformedInput(_) => "malformed_input",
        AuthError::IdentityNotFound | AuthError::InvalidCredential => "invalid_credentials",
        AuthError::AccountDisabled => "account_disabled",
        _ => "error",
    }
}

/// Create token routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/v1/token/new", post(new_access_token))
}
