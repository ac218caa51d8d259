//! User management routes (admin only)

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    middleware,
    routing::get,
};
use serde_json::{Value, json};
use tracing::{debug, info};
use warden_auth::{ActingUser, hash_password, require_admin};
use warden_db::{NewUser, UpdateUser};

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{validate_email, validate_password, validate_username};

use super::types::{
    CreateUserRequest, PaginationQuery, UpdateUserRequest, UserEnvelope, UsersPageResponse,
};

// ==================== User Routes ====================

/// GET /api/v1/users
async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<UsersPageResponse>, ApiError> {
    let Query(query) = query?;
    let page = query.page();
    let page_size = query.page_size();

    let users = state.db.list_users(page_size, query.offset()).await?;
    let total = state.db.count_users().await?;

    Ok(Json(UsersPageResponse {
        page,
        page_size,
        count: users.len(),
        total,
        users: users.into_iter().map(Into::into).collect(),
    }))
}

/// POST /api/v1/users
async fn create_user(
    ActingUser(admin): ActingUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserEnvelope>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    validate_username(&request.username)?;
    validate_email(&request.email)?;
    validate_password(&request.password)?;

    debug!("Creating user: {}", request.username);

    if state.db.user_exists(&request.username, &request.email).await? {
        return Err(ApiError::Conflict(
            "user with this username or email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&request.password)?;

    let user = state
        .db
        .insert_user(NewUser {
            username: request.username,
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            password_hash,
            is_active: request.is_active,
            is_admin: request.is_admin,
        })
        .await?;

    info!("User {} created by admin {}", user.username, admin.subject_id);

    Ok((StatusCode::CREATED, Json(UserEnvelope { user: user.into() })))
}

/// GET /api/v1/users/{id}
async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let Path(id) = id?;
    let user = state
        .db
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user was not found".to_string()))?;

    Ok(Json(UserEnvelope { user: user.into() }))
}

/// PUT /api/v1/users/{id}
async fn update_user(
    ActingUser(admin): ActingUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let Path(id) = id?;
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let update = UpdateUser {
        first_name: request.first_name,
        last_name: request.last_name,
        is_active: request.is_active,
        is_admin: request.is_admin,
    };

    if update.is_empty() {
        let user = state
            .db
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("user was not found".to_string()))?;
        return Ok(Json(UserEnvelope { user: user.into() }));
    }

    let user = state.db.update_user(id, update).await.map_err(|e| match e {
        warden_db::DbError::NotFound(_) => ApiError::NotFound("user was not found".to_string()),
        other => other.into(),
    })?;

    info!("User {} updated by admin {}", user.username, admin.subject_id);

    Ok(Json(UserEnvelope { user: user.into() }))
}

/// DELETE /api/v1/users/{id}
async fn delete_user(
    ActingUser(admin): ActingUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    if !state.db.delete_user(id).await? {
        return Err(ApiError::NotFound("user was not found".to_string()));
    }

    info!("User {} deleted by admin {}", id, admin.subject_id);

    Ok(Json(json!({})))
}

/// Create user routes, all guarded by the admin gate
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/users", get(list_users).post(create_user))
        .route(
            "/api/v1/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route_layer(middleware::from_fn_with_state(state.gate.clone(), require_admin))
}
