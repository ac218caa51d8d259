//! Profile of the calling user

use axum::{Json, Router, extract::State, middleware, routing::get};
use warden_auth::{ActingUser, require_auth};

use crate::error::ApiError;
use crate::state::AppState;

use super::types::UserEnvelope;

/// GET /api/v1/me
async fn me(user: ActingUser, State(state): State<AppState>) -> Result<Json<UserEnvelope>, ApiError> {
    let user = state
        .db
        .get_user_by_id(user.id())
        .await?
        .ok_or_else(|| ApiError::NotFound("user was not found".to_string()))?;

    Ok(Json(UserEnvelope { user: user.into() }))
}

/// Create routes open to any authenticated user
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/me", get(me))
        .route_layer(middleware::from_fn_with_state(state.gate.clone(), require_auth))
}
