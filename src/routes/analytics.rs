// ABOUTME: Analytics route handlers for spending reports and aggregations
// ABOUTME: Serves summaries, breakdowns, trends, tax reports, and top expenses

use crate::database::{
    current_year, CategoryBreakdown, MonthlyTrendPoint, SpendingSummary, TaxReport, TopExpense,
    VendorBreakdown,
};
use crate::errors::{AppError, AppResult};
use crate::server::ServerResources;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Date range filter shared by several reports
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Query for vendor and top-expense reports
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

const fn default_limit() -> i64 {
    10
}

/// Query for the monthly trend report
#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    #[serde(default = "default_months")]
    pub months: u32,
}

const fn default_months() -> u32 {
    12
}

/// Query for the tax report
#[derive(Debug, Deserialize, Default)]
pub struct TaxReportQuery {
    pub year: Option<i32>,
    pub quarter: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryBreakdown>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VendorsResponse {
    pub vendors: Vec<VendorBreakdown>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrendResponse {
    pub trend: Vec<MonthlyTrendPoint>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopExpensesResponse {
    pub expenses: Vec<TopExpense>,
}

// ============================================================================
// Routes
// ============================================================================

/// Analytics routes handler
pub struct AnalyticsRoutes;

impl AnalyticsRoutes {
    /// Create all analytics routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/analytics/summary", get(Self::summary))
            .route("/api/analytics/by-category", get(Self::by_category))
            .route("/api/analytics/by-vendor", get(Self::by_vendor))
            .route("/api/analytics/monthly-trend", get(Self::monthly_trend))
            .route("/api/analytics/tax-report", get(Self::tax_report))
            .route("/api/analytics/top-expenses", get(Self::top_expenses))
            .with_state(resources)
    }

    async fn summary(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<DateRangeQuery>,
    ) -> Result<Json<SpendingSummary>, AppError> {
        let auth = resources.auth_manager.authenticate_headers(&headers)?;
        let (start, end) = parse_range(&query.start_date, &query.end_date)?;

        let summary = resources
            .database
            .spending_summary(auth.user_id, start, end)
            .await?;
        Ok(Json(summary))
    }

    async fn by_category(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<DateRangeQuery>,
    ) -> Result<Json<CategoriesResponse>, AppError> {
        let auth = resources.auth_manager.authenticate_headers(&headers)?;
        let (start, end) = parse_range(&query.start_date, &query.end_date)?;

        let categories = resources
            .database
            .spending_by_category(auth.user_id, start, end)
            .await?;
        Ok(Json(CategoriesResponse { categories }))
    }

    async fn by_vendor(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<LimitQuery>,
    ) -> Result<Json<VendorsResponse>, AppError> {
        let auth = resources.auth_manager.authenticate_headers(&headers)?;

        let vendors = resources
            .database
            .spending_by_vendor(auth.user_id, query.limit)
            .await?;
        Ok(Json(VendorsResponse { vendors }))
    }

    async fn monthly_trend(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<TrendQuery>,
    ) -> Result<Json<TrendResponse>, AppError> {
        let auth = resources.auth_manager.authenticate_headers(&headers)?;

        let trend = resources
            .database
            .monthly_trend(auth.user_id, query.months)
            .await?;
        Ok(Json(TrendResponse { trend }))
    }

    async fn tax_report(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<TaxReportQuery>,
    ) -> Result<Json<TaxReport>, AppError> {
        let auth = resources.auth_manager.authenticate_headers(&headers)?;

        let year = query.year.unwrap_or_else(current_year);
        let report = resources
            .database
            .tax_report(auth.user_id, year, query.quarter)
            .await?;
        Ok(Json(report))
    }

    async fn top_expenses(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<LimitQuery>,
    ) -> Result<Json<TopExpensesResponse>, AppError> {
        let auth = resources.auth_manager.authenticate_headers(&headers)?;
        let (start, end) = parse_range(&query.start_date, &query.end_date)?;

        let expenses = resources
            .database
            .top_expenses(auth.user_id, query.limit, start, end)
            .await?;
        Ok(Json(TopExpensesResponse { expenses }))
    }
}

fn parse_range(
    start: &Option<String>,
    end: &Option<String>,
) -> AppResult<(Option<NaiveDate>, Option<NaiveDate>)> {
    let parse = |name: &str, raw: &Option<String>| {
        raw.as_deref()
            .map(|s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|_| AppError::invalid_input(format!("{name} must be YYYY-MM-DD")))
            })
            .transpose()
    };
    Ok((parse("startDate", start)?, parse("endDate", end)?))
}
