// ABOUTME: Database connection management and schema migration for SQLite storage
// ABOUTME: Organizes per-domain query modules behind a single Database handle

//! # Database Management
//!
//! SQLite persistence for users, invoices, line items, and chat history.
//! Each domain lives in its own module as an `impl Database` block; the
//! schema is created in code on startup. Foreign keys are enabled on every
//! connection so `ON DELETE CASCADE` holds for invoice items and user data.

mod analytics;
mod chat;
mod invoices;
mod users;

pub use analytics::{
    current_year, CategoryBreakdown, MonthlyTrendPoint, SpendingSummary, TaxInvoiceEntry,
    TaxReport, TaxReportCategory, TopExpense, VendorBreakdown,
};
pub use invoices::InvoiceFilter;

use crate::errors::AppResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

/// Database manager for all persistent state
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the connection fails, or
    /// schema migration fails.
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| crate::errors::AppError::config(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database exists per connection, so the pool must
        // not grow past one or later queries see an empty schema.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails.
    pub async fn migrate(&self) -> AppResult<()> {
        self.migrate_users().await?;
        self.migrate_invoices().await?;
        self.migrate_chat().await?;
        Ok(())
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
