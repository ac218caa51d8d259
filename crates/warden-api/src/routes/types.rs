//! Request/Response DTOs

use serde::{Deserialize, Serialize};
use warden_db::{Book, User};

// ==================== Token Types ====================

/// Token request
#[derive(Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// Token response
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in_minutes: u32,
    pub msg: String,
}

// ==================== User Types ====================

/// Create user request
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_admin: bool,
}

fn default_is_active() -> bool {
    true
}

/// Update user request
#[derive(Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_admin: Option<bool>,
}

/// User response (without password)
#[derive(Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            is_active: u.is_active,
            is_admin: u.is_admin,
            created_at: u.created_at.to_rfc3339(),
            updated_at: u.updated_at.to_rfc3339(),
        }
    }
}

/// Single user wrapper
#[derive(Serialize)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

/// Paginated users response
#[derive(Serialize)]
pub struct UsersPageResponse {
    pub page: i64,
    pub page_size: i64,
    pub count: usize,
    pub total: i64,
    pub users: Vec<UserResponse>,
}

// ==================== Book Types ====================

/// Create book request
#[derive(Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
}

/// Update book request
#[derive(Deserialize)]
pub struct UpdateBookRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Book response
#[derive(Serialize)]
pub struct BookResponse {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub author: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Book> for BookResponse {
    fn from(b: Book) -> Self {
        Self {
            id: b.id,
            user_id: b.user_id,
            title: b.title,
            author: b.author,
            description: b.description,
            created_at: b.created_at.to_rfc3339(),
            updated_at: b.updated_at.to_rfc3339(),
        }
    }
}

/// Single book wrapper
#[derive(Serialize)]
pub struct BookEnvelope {
    pub book: BookResponse,
}

/// Paginated books response
#[derive(Serialize)]
pub struct BooksPageResponse {
    pub page: i64,
    pub page_size: i64,
    pub count: usize,
    pub total: i64,
    pub books: Vec<BookResponse>,
}

// ==================== Pagination ====================

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

/// Page query parameters; missing or non-positive values fall back to defaults
#[derive(Deserialize, Default)]
pub struct PaginationQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

impl PaginationQuery {
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
            .filter(|s| *s > 0)
            .map(|s| s.min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.page_size())
    }
}
