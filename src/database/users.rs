// ABOUTME: User account database operations
// ABOUTME: Handles account creation, lookup by email and id, and deletion

use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::User;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Create the users table
    pub(super) async fn migrate_users(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                full_name TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a new user account
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` when the email is taken.
    pub async fn create_user(&self, user: &User) -> AppResult<Uuid> {
        let existing = self.get_user_by_email(&user.email).await?;
        if existing.is_some() {
            return Err(AppError::already_exists("User already exists"));
        }

        sqlx::query(
            r"
            INSERT INTO users (id, email, password_hash, full_name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(user.id)
    }

    /// Look up a user by email
    pub async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, full_name, created_at, updated_at
             FROM users WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| user_from_row(&r)).transpose()
    }

    /// Look up a user by id
    pub async fn get_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, full_name, created_at, updated_at
             FROM users WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| user_from_row(&r)).transpose()
    }

    /// Delete a user account; invoices, line items, and chat history
    /// cascade away with it
    pub async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<User> {
    Ok(User {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        full_name: row.get("full_name"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

pub(super) fn parse_uuid(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| AppError::database(format!("invalid UUID in row: {e}")))
}

pub(super) fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::database(format!("invalid timestamp in row: {e}")))
}
