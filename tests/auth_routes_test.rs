// ABOUTME: Integration tests for registration, login, and demo login
// ABOUTME: Covers validation failures, duplicate accounts, and token issuance

mod common;
mod helpers;

use common::TestEnv;
use helpers::axum_test::AxumTestRequest;
use serde_json::{json, Value};

#[tokio::test]
async fn test_register_creates_account_and_issues_token() {
    let env = TestEnv::new().await;

    let response = AxumTestRequest::post("/api/auth/register")
        .json(&json!({
            "email": "new@example.com",
            "password": "password123",
            "fullName": "New User"
        }))
        .send(env.router())
        .await;

    assert_eq!(response.status(), 201);
    let body: Value = response.json();
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["user"]["email"], "new@example.com");
    assert_eq!(body["user"]["full_name"], "New User");
    let token = body["token"].as_str().expect("token missing");

    // The token works against a protected route
    let response = AxumTestRequest::get("/api/invoices")
        .bearer(token)
        .send(env.router())
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_register_rejects_duplicate_email() {
    let env = TestEnv::new().await;
    env.create_user("taken@example.com").await;

    let response = AxumTestRequest::post("/api/auth/register")
        .json(&json!({ "email": "taken@example.com", "password": "password123" }))
        .send(env.router())
        .await;

    assert_eq!(response.status(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "RESOURCE_ALREADY_EXISTS");
}

#[tokio::test]
async fn test_register_validates_input() {
    let env = TestEnv::new().await;

    let response = AxumTestRequest::post("/api/auth/register")
        .json(&json!({ "email": "not-an-email", "password": "password123" }))
        .send(env.router())
        .await;
    assert_eq!(response.status(), 400);

    let response = AxumTestRequest::post("/api/auth/register")
        .json(&json!({ "email": "ok@example.com", "password": "short" }))
        .send(env.router())
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_login_round_trip() {
    let env = TestEnv::new().await;
    env.create_user("login@example.com").await;

    let response = AxumTestRequest::post("/api/auth/login")
        .json(&json!({ "email": "login@example.com", "password": "password123" }))
        .send(env.router())
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["message"], "Login successful");
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let env = TestEnv::new().await;
    env.create_user("login@example.com").await;

    let response = AxumTestRequest::post("/api/auth/login")
        .json(&json!({ "email": "login@example.com", "password": "wrong-password" }))
        .send(env.router())
        .await;
    assert_eq!(response.status(), 401);

    let response = AxumTestRequest::post("/api/auth/login")
        .json(&json!({ "email": "nobody@example.com", "password": "password123" }))
        .send(env.router())
        .await;
    assert_eq!(response.status(), 401);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "AUTH_INVALID");
}

#[tokio::test]
async fn test_demo_login_creates_working_account() {
    let env = TestEnv::new().await;

    let response = AxumTestRequest::post("/api/auth/demo-login")
        .send(env.router())
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    let email = body["user"]["email"].as_str().expect("email missing");
    assert!(email.starts_with("demo_"));
    assert!(email.ends_with("@invoiceinsights.demo"));
    assert_eq!(body["user"]["full_name"], "Demo User");

    let token = body["token"].as_str().expect("token missing");
    let response = AxumTestRequest::get("/api/chat/history")
        .bearer(token)
        .send(env.router())
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let env = TestEnv::new().await;

    for uri in [
        "/api/invoices",
        "/api/chat/history",
        "/api/analytics/summary",
    ] {
        let response = AxumTestRequest::get(uri).send(env.router()).await;
        assert_eq!(response.status(), 401, "{uri}");
    }

    let response = AxumTestRequest::get("/api/invoices")
        .bearer("not-a-real-token")
        .send(env.router())
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_health_is_public() {
    let env = TestEnv::new().await;

    let response = AxumTestRequest::get("/health").send(env.router()).await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "invoice-insights-api");
}
