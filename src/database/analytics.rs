// ABOUTME: Spending analytics aggregation queries over persisted invoices
// ABOUTME: Computes summaries, category and vendor breakdowns, trends, and tax reports

use super::users::parse_uuid;
use super::Database;
use crate::errors::{AppError, AppResult};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

/// Aggregate spending totals over an optional date range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingSummary {
    pub total_invoices: i64,
    pub total_spent: f64,
    pub total_tax: f64,
    pub average_invoice: f64,
}

/// Per-category spending totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub invoice_count: i64,
    pub total_spent: f64,
}

/// Per-vendor spending totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorBreakdown {
    pub vendor_name: String,
    pub invoice_count: i64,
    pub total_spent: f64,
    pub last_invoice_date: Option<NaiveDate>,
}

/// One month's spending in the trend series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyTrendPoint {
    /// Month bucket formatted `YYYY-MM`
    pub month: String,
    pub invoice_count: i64,
    pub total_spent: f64,
    pub total_tax: f64,
}

/// Yearly tax report with per-category detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxReport {
    pub year: i32,
    pub quarter: Option<u8>,
    pub categories: Vec<TaxReportCategory>,
    pub total_amount: f64,
    pub total_tax: f64,
}

/// One category's rollup inside the tax report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxReportCategory {
    pub category: String,
    pub invoice_count: i64,
    pub total_amount: f64,
    pub total_tax: f64,
    pub invoices: Vec<TaxInvoiceEntry>,
}

/// A single invoice reference inside a tax report category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxInvoiceEntry {
    pub id: Uuid,
    pub vendor_name: String,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub total_amount: f64,
    pub tax_amount: f64,
}

/// One of the largest single expenses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopExpense {
    pub id: Uuid,
    pub vendor_name: String,
    pub category: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub total_amount: f64,
}

impl Database {
    /// Aggregate spending totals; an empty range yields zeros, never null
    pub async fn spending_summary(
        &self,
        user_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> AppResult<SpendingSummary> {
        let (range_sql, binds) = date_range_clause(start_date, end_date);
        let sql = format!(
            "SELECT COUNT(*) AS total_invoices,
                    COALESCE(SUM(total_amount), 0.0) AS total_spent,
                    COALESCE(SUM(tax_amount), 0.0) AS total_tax,
                    COALESCE(AVG(total_amount), 0.0) AS average_invoice
             FROM invoices WHERE user_id = ?{range_sql}"
        );

        let mut query = sqlx::query(&sql).bind(user_id.to_string());
        for bind in &binds {
            query = query.bind(bind);
        }
        let row = query.fetch_one(&self.pool).await?;

        Ok(SpendingSummary {
            total_invoices: row.get("total_invoices"),
            total_spent: row.get("total_spent"),
            total_tax: row.get("total_tax"),
            average_invoice: row.get("average_invoice"),
        })
    }

    /// Spending per category, highest spend first
    pub async fn spending_by_category(
        &self,
        user_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> AppResult<Vec<CategoryBreakdown>> {
        let (range_sql, binds) = date_range_clause(start_date, end_date);
        let sql = format!(
            "SELECT COALESCE(category, 'Uncategorized') AS category,
                    COUNT(*) AS invoice_count,
                    COALESCE(SUM(total_amount), 0) AS total_spent
             FROM invoices WHERE user_id = ?{range_sql}
             GROUP BY COALESCE(category, 'Uncategorized')
             ORDER BY total_spent DESC"
        );

        let mut query = sqlx::query(&sql).bind(user_id.to_string());
        for bind in &binds {
            query = query.bind(bind);
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| CategoryBreakdown {
                category: row.get("category"),
                invoice_count: row.get("invoice_count"),
                total_spent: row.get("total_spent"),
            })
            .collect())
    }

    /// Top vendors by total spend
    pub async fn spending_by_vendor(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<VendorBreakdown>> {
        let rows = sqlx::query(
            "SELECT vendor_name,
                    COUNT(*) AS invoice_count,
                    COALESCE(SUM(total_amount), 0) AS total_spent,
                    MAX(invoice_date) AS last_invoice_date
             FROM invoices WHERE user_id = ?1
             GROUP BY vendor_name
             ORDER BY total_spent DESC
             LIMIT ?2",
        )
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| VendorBreakdown {
                vendor_name: row.get("vendor_name"),
                invoice_count: row.get("invoice_count"),
                total_spent: row.get("total_spent"),
                last_invoice_date: parse_date(row.get::<Option<String>, _>("last_invoice_date")),
            })
            .collect())
    }

    /// Monthly spending buckets covering the trailing `months` months,
    /// newest month first
    pub async fn monthly_trend(
        &self,
        user_id: Uuid,
        months: u32,
    ) -> AppResult<Vec<MonthlyTrendPoint>> {
        let cutoff = Utc::now()
            .date_naive()
            .checked_sub_months(chrono::Months::new(months))
            .ok_or_else(|| AppError::invalid_input("months value is out of range"))?;

        let rows = sqlx::query(
            "SELECT strftime('%Y-%m', invoice_date) AS month,
                    COUNT(*) AS invoice_count,
                    COALESCE(SUM(total_amount), 0) AS total_spent,
                    COALESCE(SUM(tax_amount), 0) AS total_tax
             FROM invoices
             WHERE user_id = ?1 AND invoice_date IS NOT NULL AND invoice_date >= ?2
             GROUP BY month
             ORDER BY month DESC",
        )
        .bind(user_id.to_string())
        .bind(cutoff.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| MonthlyTrendPoint {
                month: row.get("month"),
                invoice_count: row.get("invoice_count"),
                total_spent: row.get("total_spent"),
                total_tax: row.get("total_tax"),
            })
            .collect())
    }

    /// Tax report for one year, optionally narrowed to a quarter
    pub async fn tax_report(
        &self,
        user_id: Uuid,
        year: i32,
        quarter: Option<u8>,
    ) -> AppResult<TaxReport> {
        let mut sql = String::from(
            "SELECT id, vendor_name, invoice_number, invoice_date, total_amount, tax_amount,
                    COALESCE(category, 'Uncategorized') AS category
             FROM invoices
             WHERE user_id = ? AND strftime('%Y', invoice_date) = ?",
        );
        if quarter.is_some() {
            sql.push_str(" AND CAST(strftime('%m', invoice_date) AS INTEGER) BETWEEN ? AND ?");
        }
        sql.push_str(" ORDER BY category ASC, invoice_date ASC");

        let mut query = sqlx::query(&sql)
            .bind(user_id.to_string())
            .bind(format!("{year:04}"));
        if let Some(quarter) = quarter {
            let (first, last) = quarter_months(quarter)?;
            query = query.bind(first).bind(last);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut categories: Vec<TaxReportCategory> = Vec::new();
        let mut total_amount = 0.0;
        let mut total_tax = 0.0;

        for row in &rows {
            let entry = TaxInvoiceEntry {
                id: parse_uuid(&row.get::<String, _>("id"))?,
                vendor_name: row.get("vendor_name"),
                invoice_number: row.get("invoice_number"),
                invoice_date: parse_date(row.get::<Option<String>, _>("invoice_date")),
                total_amount: row.get("total_amount"),
                tax_amount: row.get("tax_amount"),
            };
            total_amount += entry.total_amount;
            total_tax += entry.tax_amount;

            let category: String = row.get("category");
            match categories.last_mut() {
                Some(current) if current.category == category => {
                    current.invoice_count += 1;
                    current.total_amount += entry.total_amount;
                    current.total_tax += entry.tax_amount;
                    current.invoices.push(entry);
                }
                _ => categories.push(TaxReportCategory {
                    category,
                    invoice_count: 1,
                    total_amount: entry.total_amount,
                    total_tax: entry.tax_amount,
                    invoices: vec![entry],
                }),
            }
        }

        Ok(TaxReport {
            year,
            quarter,
            categories,
            total_amount,
            total_tax,
        })
    }

    /// Largest single expenses, optionally bounded by a date range
    pub async fn top_expenses(
        &self,
        user_id: Uuid,
        limit: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> AppResult<Vec<TopExpense>> {
        let (range_sql, binds) = date_range_clause(start_date, end_date);
        let sql = format!(
            "SELECT id, vendor_name, category, invoice_date, total_amount
             FROM invoices WHERE user_id = ?{range_sql}
             ORDER BY total_amount DESC
             LIMIT ?"
        );

        let mut query = sqlx::query(&sql).bind(user_id.to_string());
        for bind in &binds {
            query = query.bind(bind);
        }
        let rows = query.bind(limit).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(TopExpense {
                    id: parse_uuid(&row.get::<String, _>("id"))?,
                    vendor_name: row.get("vendor_name"),
                    category: row.get("category"),
                    invoice_date: parse_date(row.get::<Option<String>, _>("invoice_date")),
                    total_amount: row.get("total_amount"),
                })
            })
            .collect()
    }
}

fn date_range_clause(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> (String, Vec<String>) {
    let mut sql = String::new();
    let mut binds = Vec::new();
    if let Some(start) = start_date {
        sql.push_str(" AND invoice_date >= ?");
        binds.push(start.to_string());
    }
    if let Some(end) = end_date {
        sql.push_str(" AND invoice_date <= ?");
        binds.push(end.to_string());
    }
    (sql, binds)
}

fn quarter_months(quarter: u8) -> AppResult<(u32, u32)> {
    match quarter {
        1 => Ok((1, 3)),
        2 => Ok((4, 6)),
        3 => Ok((7, 9)),
        4 => Ok((10, 12)),
        _ => Err(AppError::invalid_input("quarter must be between 1 and 4")),
    }
}

/// Default year for tax reports is the current calendar year
#[must_use]
pub fn current_year() -> i32 {
    Utc::now().year()
}

fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}
