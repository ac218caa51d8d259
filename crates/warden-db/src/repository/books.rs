//! Book operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{Book, NewBook, UpdateBook};
use crate::repository::Database;

const BOOK_COLUMNS: &str = "id, user_id, title, author, description, created_at, updated_at";

impl Database {
    // ==================== Book Operations ====================

    /// Insert a new book
    pub async fn insert_book(&self, book: NewBook) -> Result<Book, DbError> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO books (user_id, title, author, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(book.user_id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = result.get("id");

        Ok(Book {
            id,
            user_id: book.user_id,
            title: book.title,
            author: book.author,
            description: book.description,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a book by ID
    pub async fn get_book(&self, id: i64) -> Result<Option<Book>, DbError> {
        let result = sqlx::query(&format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| Book::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List one page of books ordered by ID
    pub async fn list_books(&self, limit: i64, offset: i64) -> Result<Vec<Book>, DbError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM books ORDER BY id LIMIT ? OFFSET ?",
            BOOK_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Book::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Count all books
    pub async fn count_books(&self) -> Result<i64, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(result.get("count"))
    }

    /// Apply a partial update, returning the updated book
    pub async fn update_book(&self, id: i64, update: UpdateBook) -> Result<Book, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = COALESCE(?, title),
                author = COALESCE(?, author),
                description = COALESCE(?, description),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.title)
        .bind(update.author)
        .bind(update.description)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Book: {}", id)));
        }

        self.get_book(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Book: {}", id)))
    }

    /// Delete a book
    pub async fn delete_book(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
