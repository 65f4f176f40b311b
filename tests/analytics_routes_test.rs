// ABOUTME: Integration tests for the analytics and reporting routes
// ABOUTME: Covers summaries, breakdowns, trends, tax reports, and top expenses

mod common;
mod helpers;

use chrono::{Datelike, Months, NaiveDate, Utc};
use common::TestEnv;
use helpers::axum_test::AxumTestRequest;
use serde_json::Value;

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

#[tokio::test]
async fn test_summary_is_zeroed_without_invoices() {
    let env = TestEnv::new().await;
    let (_, token) = env.create_user("empty@example.com").await;

    let response = AxumTestRequest::get("/api/analytics/summary")
        .bearer(&token)
        .send(env.router())
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["total_invoices"], 0);
    assert_eq!(body["total_spent"], 0.0);
    assert_eq!(body["total_tax"], 0.0);
    assert_eq!(body["average_invoice"], 0.0);
}

#[tokio::test]
async fn test_summary_aggregates_and_filters_by_date() {
    let env = TestEnv::new().await;
    let (user, token) = env.create_user("summary@example.com").await;

    env.seed_invoice(user.id, "Acme", 100.0, 10.0, None, date(2024, 2, 1), &[])
        .await;
    env.seed_invoice(user.id, "Globex", 300.0, 30.0, None, date(2024, 8, 1), &[])
        .await;

    let response = AxumTestRequest::get("/api/analytics/summary")
        .bearer(&token)
        .send(env.router())
        .await;
    let body: Value = response.json();
    assert_eq!(body["total_invoices"], 2);
    assert_eq!(body["total_spent"], 400.0);
    assert_eq!(body["total_tax"], 40.0);
    assert_eq!(body["average_invoice"], 200.0);

    let response =
        AxumTestRequest::get("/api/analytics/summary?startDate=2024-06-01&endDate=2024-12-31")
            .bearer(&token)
            .send(env.router())
            .await;
    let body: Value = response.json();
    assert_eq!(body["total_invoices"], 1);
    assert_eq!(body["total_spent"], 300.0);

    let response = AxumTestRequest::get("/api/analytics/summary?startDate=June")
        .bearer(&token)
        .send(env.router())
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_by_category_orders_by_spend_and_names_uncategorized() {
    let env = TestEnv::new().await;
    let (user, token) = env.create_user("categories@example.com").await;

    env.seed_invoice(user.id, "Acme", 50.0, 0.0, Some("Software"), None, &[])
        .await;
    env.seed_invoice(user.id, "Acme", 70.0, 0.0, Some("Software"), None, &[])
        .await;
    env.seed_invoice(user.id, "Dell", 900.0, 0.0, Some("Hardware"), None, &[])
        .await;
    env.seed_invoice(user.id, "Corner Shop", 15.0, 0.0, None, None, &[])
        .await;

    let response = AxumTestRequest::get("/api/analytics/by-category")
        .bearer(&token)
        .send(env.router())
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    let categories = body["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 3);
    assert_eq!(categories[0]["category"], "Hardware");
    assert_eq!(categories[0]["total_spent"], 900.0);
    assert_eq!(categories[1]["category"], "Software");
    assert_eq!(categories[1]["invoice_count"], 2);
    assert_eq!(categories[1]["total_spent"], 120.0);
    assert_eq!(categories[2]["category"], "Uncategorized");
}

#[tokio::test]
async fn test_by_vendor_aggregates_and_limits() {
    let env = TestEnv::new().await;
    let (user, token) = env.create_user("vendors@example.com").await;

    env.seed_invoice(user.id, "Acme", 100.0, 0.0, None, date(2024, 1, 5), &[])
        .await;
    env.seed_invoice(user.id, "Acme", 200.0, 0.0, None, date(2024, 6, 5), &[])
        .await;
    env.seed_invoice(user.id, "Globex", 250.0, 0.0, None, date(2024, 3, 1), &[])
        .await;
    env.seed_invoice(user.id, "Initech", 10.0, 0.0, None, None, &[])
        .await;

    let response = AxumTestRequest::get("/api/analytics/by-vendor?limit=2")
        .bearer(&token)
        .send(env.router())
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    let vendors = body["vendors"].as_array().unwrap();
    assert_eq!(vendors.len(), 2);
    assert_eq!(vendors[0]["vendor_name"], "Acme");
    assert_eq!(vendors[0]["invoice_count"], 2);
    assert_eq!(vendors[0]["total_spent"], 300.0);
    assert_eq!(vendors[0]["last_invoice_date"], "2024-06-05");
    assert_eq!(vendors[1]["vendor_name"], "Globex");
}

#[tokio::test]
async fn test_monthly_trend_buckets_by_month() {
    let env = TestEnv::new().await;
    let (user, token) = env.create_user("trend@example.com").await;

    let today = Utc::now().date_naive();
    let last_month = today.checked_sub_months(Months::new(1)).unwrap();
    env.seed_invoice(user.id, "Acme", 100.0, 10.0, None, Some(today), &[])
        .await;
    env.seed_invoice(user.id, "Acme", 50.0, 5.0, None, Some(today), &[])
        .await;
    env.seed_invoice(user.id, "Globex", 80.0, 8.0, None, Some(last_month), &[])
        .await;
    // Undated invoices never join a bucket
    env.seed_invoice(user.id, "Initech", 999.0, 0.0, None, None, &[])
        .await;

    let response = AxumTestRequest::get("/api/analytics/monthly-trend?months=3")
        .bearer(&token)
        .send(env.router())
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    // Newest month first
    let trend = body["trend"].as_array().unwrap();
    assert_eq!(trend.len(), 2);
    assert_eq!(
        trend[0]["month"],
        format!("{:04}-{:02}", today.year(), today.month())
    );
    assert_eq!(trend[0]["invoice_count"], 2);
    assert_eq!(trend[0]["total_spent"], 150.0);
    assert_eq!(trend[0]["total_tax"], 15.0);
    assert_eq!(
        trend[1]["month"],
        format!("{:04}-{:02}", last_month.year(), last_month.month())
    );
    assert_eq!(trend[1]["total_spent"], 80.0);
}

#[tokio::test]
async fn test_tax_report_filters_year_and_quarter() {
    let env = TestEnv::new().await;
    let (user, token) = env.create_user("tax@example.com").await;

    env.seed_invoice(user.id, "Acme", 100.0, 10.0, Some("Software"), date(2024, 2, 1), &[])
        .await;
    env.seed_invoice(user.id, "Acme", 200.0, 20.0, Some("Software"), date(2024, 3, 15), &[])
        .await;
    env.seed_invoice(user.id, "Dell", 500.0, 50.0, Some("Hardware"), date(2024, 8, 1), &[])
        .await;
    env.seed_invoice(user.id, "Old Co", 999.0, 99.0, Some("Software"), date(2023, 2, 1), &[])
        .await;

    let response = AxumTestRequest::get("/api/analytics/tax-report?year=2024")
        .bearer(&token)
        .send(env.router())
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["year"], 2024);
    assert_eq!(body["total_amount"], 800.0);
    assert_eq!(body["total_tax"], 80.0);
    assert_eq!(body["categories"].as_array().unwrap().len(), 2);

    let response = AxumTestRequest::get("/api/analytics/tax-report?year=2024&quarter=1")
        .bearer(&token)
        .send(env.router())
        .await;
    let body: Value = response.json();
    assert_eq!(body["quarter"], 1);
    assert_eq!(body["total_amount"], 300.0);
    let categories = body["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["category"], "Software");
    assert_eq!(categories[0]["invoice_count"], 2);
    assert_eq!(categories[0]["invoices"].as_array().unwrap().len(), 2);

    let response = AxumTestRequest::get("/api/analytics/tax-report?year=2024&quarter=9")
        .bearer(&token)
        .send(env.router())
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_top_expenses_orders_and_limits() {
    let env = TestEnv::new().await;
    let (user, token) = env.create_user("top@example.com").await;

    env.seed_invoice(user.id, "Small", 10.0, 0.0, None, None, &[]).await;
    env.seed_invoice(user.id, "Medium", 500.0, 0.0, None, None, &[]).await;
    env.seed_invoice(user.id, "Large", 5000.0, 0.0, None, None, &[]).await;

    let response = AxumTestRequest::get("/api/analytics/top-expenses?limit=2")
        .bearer(&token)
        .send(env.router())
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    let expenses = body["expenses"].as_array().unwrap();
    assert_eq!(expenses.len(), 2);
    assert_eq!(expenses[0]["vendor_name"], "Large");
    assert_eq!(expenses[0]["total_amount"], 5000.0);
    assert_eq!(expenses[1]["vendor_name"], "Medium");
}

#[tokio::test]
async fn test_analytics_are_scoped_per_user() {
    let env = TestEnv::new().await;
    let (alice, _) = env.create_user("alice@example.com").await;
    let (_, bob_token) = env.create_user("bob@example.com").await;

    env.seed_invoice(alice.id, "Acme", 400.0, 40.0, None, None, &[])
        .await;

    let response = AxumTestRequest::get("/api/analytics/summary")
        .bearer(&bob_token)
        .send(env.router())
        .await;
    let body: Value = response.json();
    assert_eq!(body["total_invoices"], 0);
    assert_eq!(body["total_spent"], 0.0);
}
