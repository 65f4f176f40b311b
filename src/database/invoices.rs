// ABOUTME: Invoice and line item database operations with transactional writes
// ABOUTME: Handles owner-scoped listing, filtering, updates, and cascade deletion

use super::users::{parse_timestamp, parse_uuid};
use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{Invoice, LineItem};
use chrono::NaiveDate;
use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

/// Optional filters for invoice listing
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    /// Inclusive lower bound on invoice_date
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on invoice_date
    pub end_date: Option<NaiveDate>,
    /// Exact category match
    pub category: Option<String>,
    /// Case-insensitive vendor substring match
    pub vendor: Option<String>,
}

impl Database {
    /// Create the invoices and invoice_items tables
    pub(super) async fn migrate_invoices(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS invoices (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                vendor_name TEXT NOT NULL,
                invoice_number TEXT,
                invoice_date TEXT,
                due_date TEXT,
                total_amount REAL NOT NULL,
                tax_amount REAL NOT NULL DEFAULT 0,
                subtotal REAL,
                currency TEXT NOT NULL DEFAULT 'USD',
                category TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                file_url TEXT,
                file_type TEXT,
                storage_key TEXT,
                metadata TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS invoice_items (
                id TEXT PRIMARY KEY,
                invoice_id TEXT NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
                description TEXT NOT NULL,
                quantity REAL NOT NULL DEFAULT 1,
                unit_price REAL,
                total_price REAL NOT NULL,
                category TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_invoices_user_id ON invoices(user_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_invoices_invoice_date ON invoices(invoice_date)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_invoices_vendor_name ON invoices(vendor_name)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_invoice_items_invoice_id ON invoice_items(invoice_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist an invoice and all of its line items in one transaction.
    ///
    /// Zero line items is valid. If any insert fails the whole transaction
    /// rolls back and nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceFailed` on any write failure.
    pub async fn create_invoice_with_items(&self, invoice: &Invoice) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::persistence(e.to_string()).with_source(e))?;

        sqlx::query(
            r"
            INSERT INTO invoices (
                id, user_id, vendor_name, invoice_number, invoice_date, due_date,
                total_amount, tax_amount, subtotal, currency, category, status,
                file_url, file_type, storage_key, metadata, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            ",
        )
        .bind(invoice.id.to_string())
        .bind(invoice.user_id.to_string())
        .bind(&invoice.vendor_name)
        .bind(&invoice.invoice_number)
        .bind(invoice.invoice_date.map(|d| d.to_string()))
        .bind(invoice.due_date.map(|d| d.to_string()))
        .bind(invoice.total_amount)
        .bind(invoice.tax_amount)
        .bind(invoice.subtotal)
        .bind(&invoice.currency)
        .bind(&invoice.category)
        .bind(&invoice.status)
        .bind(&invoice.file_url)
        .bind(&invoice.file_type)
        .bind(&invoice.storage_key)
        .bind(invoice.metadata.as_ref().map(serde_json::Value::to_string))
        .bind(invoice.created_at.to_rfc3339())
        .bind(invoice.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::persistence(e.to_string()).with_source(e))?;

        for item in &invoice.line_items {
            sqlx::query(
                r"
                INSERT INTO invoice_items (
                    id, invoice_id, description, quantity, unit_price,
                    total_price, category, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
            )
            .bind(item.id.to_string())
            .bind(item.invoice_id.to_string())
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.total_price)
            .bind(&item.category)
            .bind(item.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::persistence(e.to_string()).with_source(e))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::persistence(e.to_string()).with_source(e))?;

        Ok(())
    }

    /// List a user's invoices newest-first, with nested line items
    pub async fn list_invoices(
        &self,
        user_id: Uuid,
        filter: &InvoiceFilter,
    ) -> AppResult<Vec<Invoice>> {
        let mut sql = String::from(
            "SELECT id, user_id, vendor_name, invoice_number, invoice_date, due_date,
                    total_amount, tax_amount, subtotal, currency, category, status,
                    file_url, file_type, storage_key, metadata, created_at, updated_at
             FROM invoices WHERE user_id = ?",
        );
        let mut binds: Vec<String> = vec![user_id.to_string()];

        if let Some(start) = filter.start_date {
            sql.push_str(" AND invoice_date >= ?");
            binds.push(start.to_string());
        }
        if let Some(end) = filter.end_date {
            sql.push_str(" AND invoice_date <= ?");
            binds.push(end.to_string());
        }
        if let Some(category) = &filter.category {
            sql.push_str(" AND category = ?");
            binds.push(category.clone());
        }
        if let Some(vendor) = &filter.vendor {
            sql.push_str(" AND vendor_name LIKE ? COLLATE NOCASE");
            binds.push(format!("%{vendor}%"));
        }
        sql.push_str(" ORDER BY invoice_date DESC");

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let mut invoices = rows
            .iter()
            .map(invoice_from_row)
            .collect::<AppResult<Vec<_>>>()?;

        self.attach_line_items(&mut invoices).await?;
        Ok(invoices)
    }

    /// Fetch one invoice, owner-scoped, with line items
    pub async fn get_invoice(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<Invoice>> {
        let row = sqlx::query(
            "SELECT id, user_id, vendor_name, invoice_number, invoice_date, due_date,
                    total_amount, tax_amount, subtotal, currency, category, status,
                    file_url, file_type, storage_key, metadata, created_at, updated_at
             FROM invoices WHERE id = ?1 AND user_id = ?2",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut invoices = vec![invoice_from_row(&row)?];
        self.attach_line_items(&mut invoices).await?;
        Ok(invoices.pop())
    }

    /// Partially update an invoice's category, status, or notes.
    ///
    /// Notes are merged into the metadata JSON object under a `notes` key.
    /// Returns the updated invoice, or None when it does not exist or
    /// belongs to another user.
    pub async fn update_invoice(
        &self,
        user_id: Uuid,
        id: Uuid,
        category: Option<&str>,
        status: Option<&str>,
        notes: Option<&str>,
    ) -> AppResult<Option<Invoice>> {
        let Some(current) = self.get_invoice(user_id, id).await? else {
            return Ok(None);
        };

        let category = category.map_or_else(|| current.category.clone(), |c| Some(c.to_owned()));
        let status = status.map_or_else(|| current.status.clone(), str::to_owned);
        let metadata = match notes {
            Some(notes) => {
                let mut value = current
                    .metadata
                    .clone()
                    .unwrap_or_else(|| serde_json::json!({}));
                if let Some(object) = value.as_object_mut() {
                    object.insert("notes".into(), serde_json::Value::String(notes.to_owned()));
                }
                Some(value)
            }
            None => current.metadata.clone(),
        };

        sqlx::query(
            r"
            UPDATE invoices
            SET category = ?1, status = ?2, metadata = ?3, updated_at = ?4
            WHERE id = ?5 AND user_id = ?6
            ",
        )
        .bind(&category)
        .bind(&status)
        .bind(metadata.as_ref().map(serde_json::Value::to_string))
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(id.to_string())
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await?;

        self.get_invoice(user_id, id).await
    }

    /// Delete an invoice row; line items cascade away with it
    pub async fn delete_invoice(&self, user_id: Uuid, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = ?1 AND user_id = ?2")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Newest invoices with items, used as assistant context
    pub async fn recent_invoices_with_items(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<Invoice>> {
        let rows = sqlx::query(
            "SELECT id, user_id, vendor_name, invoice_number, invoice_date, due_date,
                    total_amount, tax_amount, subtotal, currency, category, status,
                    file_url, file_type, storage_key, metadata, created_at, updated_at
             FROM invoices WHERE user_id = ?1
             ORDER BY invoice_date DESC LIMIT ?2",
        )
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut invoices = rows
            .iter()
            .map(invoice_from_row)
            .collect::<AppResult<Vec<_>>>()?;

        self.attach_line_items(&mut invoices).await?;
        Ok(invoices)
    }

    /// Load line items for a batch of invoices with one query
    async fn attach_line_items(&self, invoices: &mut [Invoice]) -> AppResult<()> {
        if invoices.is_empty() {
            return Ok(());
        }

        let placeholders = invoices
            .iter()
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, invoice_id, description, quantity, unit_price,
                    total_price, category, created_at
             FROM invoice_items WHERE invoice_id IN ({placeholders})
             ORDER BY created_at ASC"
        );

        let mut query = sqlx::query(&sql);
        for invoice in invoices.iter() {
            query = query.bind(invoice.id.to_string());
        }

        let rows = query.fetch_all(&self.pool).await?;
        let mut by_invoice: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
        for row in &rows {
            let item = line_item_from_row(row)?;
            by_invoice.entry(item.invoice_id).or_default().push(item);
        }

        for invoice in invoices.iter_mut() {
            invoice.line_items = by_invoice.remove(&invoice.id).unwrap_or_default();
        }

        Ok(())
    }
}

fn invoice_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<Invoice> {
    let metadata = row
        .get::<Option<String>, _>("metadata")
        .and_then(|raw| serde_json::from_str(&raw).ok());

    Ok(Invoice {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
        vendor_name: row.get("vendor_name"),
        invoice_number: row.get("invoice_number"),
        invoice_date: parse_date(row.get::<Option<String>, _>("invoice_date")),
        due_date: parse_date(row.get::<Option<String>, _>("due_date")),
        total_amount: row.get("total_amount"),
        tax_amount: row.get("tax_amount"),
        subtotal: row.get("subtotal"),
        currency: row.get("currency"),
        category: row.get("category"),
        status: row.get("status"),
        file_url: row.get("file_url"),
        file_type: row.get("file_type"),
        storage_key: row.get("storage_key"),
        metadata,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
        line_items: Vec::new(),
    })
}

fn line_item_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<LineItem> {
    Ok(LineItem {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        invoice_id: parse_uuid(&row.get::<String, _>("invoice_id"))?,
        description: row.get("description"),
        quantity: row.get("quantity"),
        unit_price: row.get("unit_price"),
        total_price: row.get("total_price"),
        category: row.get("category"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}
