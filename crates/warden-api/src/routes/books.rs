//! Book catalogue routes
//!
//! Reads are public. Writes need a valid token; the acting user becomes the
//! owner of a new book, and only the owner or an admin may change it.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    middleware,
    routing::{post, put},
};
use serde_json::{Value, json};
use tracing::{debug, info};
use warden_auth::{ActingUser, require_auth};
use warden_db::{Book, NewBook, UpdateBook};

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{validate_book_field, validate_description};

use super::types::{
    BookEnvelope, BooksPageResponse, CreateBookRequest, PaginationQuery, UpdateBookRequest,
};

async fn find_book(state: &AppState, id: i64) -> Result<Book, ApiError> {
    state
        .db
        .get_book(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("book was not found".to_string()))
}

fn ensure_can_modify(user: &ActingUser, book: &Book) -> Result<(), ApiError> {
    if book.user_id == user.id() || user.is_admin() {
        return Ok(());
    }
    Err(ApiError::Forbidden(
        "only the owner of this book can modify it".to_string(),
    ))
}

/// GET /api/v1/books
async fn list_books(
    State(state): State<AppState>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<BooksPageResponse>, ApiError> {
    let Query(query) = query?;
    let page = query.page();
    let page_size = query.page_size();

    let books = state.db.list_books(page_size, query.offset()).await?;
    let total = state.db.count_books().await?;

    Ok(Json(BooksPageResponse {
        page,
        page_size,
        count: books.len(),
        total,
        books: books.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/v1/books/{id}
async fn get_book(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<BookEnvelope>, ApiError> {
    let Path(id) = id?;
    let book = find_book(&state, id).await?;
    Ok(Json(BookEnvelope { book: book.into() }))
}

/// POST /api/v1/books
async fn create_book(
    user: ActingUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateBookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookEnvelope>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    validate_book_field("Title", &request.title)?;
    validate_book_field("Author", &request.author)?;
    validate_description(&request.description)?;

    debug!("Creating book '{}' for user {}", request.title, user.id());

    let book = state
        .db
        .insert_book(NewBook {
            user_id: user.id(),
            title: request.title,
            author: request.author,
            description: request.description,
        })
        .await?;

    info!("Book {} created by user {}", book.id, book.user_id);

    Ok((StatusCode::CREATED, Json(BookEnvelope { book: book.into() })))
}

/// PUT /api/v1/books/{id}
async fn update_book(
    user: ActingUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateBookRequest>, JsonRejection>,
) -> Result<Json<BookEnvelope>, ApiError> {
    let Path(id) = id?;
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if let Some(title) = &request.title {
        validate_book_field("Title", title)?;
    }
    if let Some(author) = &request.author {
        validate_book_field("Author", author)?;
    }
    if let Some(description) = &request.description {
        validate_description(description)?;
    }

    let book = find_book(&state, id).await?;
    ensure_can_modify(&user, &book)?;

    let update = UpdateBook {
        title: request.title,
        author: request.author,
        description: request.description,
    };
    if update.is_empty() {
        return Ok(Json(BookEnvelope { book: book.into() }));
    }

    let book = state.db.update_book(id, update).await.map_err(|e| match e {
        warden_db::DbError::NotFound(_) => ApiError::NotFound("book was not found".to_string()),
        other => other.into(),
    })?;

    info!("Book {} updated by user {}", book.id, user.id());

    Ok(Json(BookEnvelope { book: book.into() }))
}

/// DELETE /api/v1/books/{id}
async fn delete_book(
    user: ActingUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;

    let book = find_book(&state, id).await?;
    ensure_can_modify(&user, &book)?;

    if !state.db.delete_book(id).await? {
        return Err(ApiError::NotFound("book was not found".to_string()));
    }

    info!("Book {} deleted by user {}", id, user.id());

    Ok(Json(json!({})))
}

/// Create book routes; only the write methods pass through the token gate
pub fn routes(state: &AppState) -> Router<AppState> {
    let gate = middleware::from_fn_with_state(state.gate.clone(), require_auth);

    Router::new()
        .route(
            "/api/v1/books",
            post(create_book).route_layer(gate.clone()).get(list_books),
        )
        .route(
            "/api/v1/books/{id}",
            put(update_book)
                .delete(delete_book)
                .route_layer(gate)
                .get(get_book),
        )
}
