// ABOUTME: Public health check endpoint
// ABOUTME: Reports service status and current timestamp without authentication

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

/// Health check routes handler
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health route
    #[must_use]
    pub fn routes() -> Router {
        Router::new().route("/health", get(Self::health))
    }

    async fn health() -> Json<serde_json::Value> {
        Json(json!({
            "status": "ok",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "service": "invoice-insights-api",
        }))
    }
}
