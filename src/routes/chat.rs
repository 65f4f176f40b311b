// ABOUTME: Chat route handlers for the invoice assistant
// ABOUTME: Builds invoice context, replays history, and persists conversation turns

use crate::errors::AppError;
use crate::llm::{ChatTurn, MessageRole};
use crate::models::{ChatMessage, Invoice};
use crate::server::ServerResources;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Newest invoices included as assistant context
const CONTEXT_INVOICE_LIMIT: i64 = 50;

/// History turns replayed to the model
const HISTORY_TURN_LIMIT: i64 = 10;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Incoming chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Assistant reply
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub timestamp: String,
}

/// Chat history listing
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatHistoryResponse {
    pub history: Vec<ChatMessage>,
    pub count: usize,
}

/// Query parameters for history listing
#[derive(Debug, Deserialize, Default)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

const fn default_history_limit() -> i64 {
    50
}

// ============================================================================
// Routes
// ============================================================================

/// Chat routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/chat", post(Self::send_message))
            .route("/api/chat/history", get(Self::get_history))
            .route("/api/chat/history", delete(Self::clear_history))
            .with_state(resources)
    }

    async fn send_message(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<ChatRequest>,
    ) -> Result<Json<ChatResponse>, AppError> {
        let auth = resources.auth_manager.authenticate_headers(&headers)?;

        if request.message.trim().is_empty() {
            return Err(AppError::missing_field("Message is required"));
        }

        let invoices = resources
            .database
            .recent_invoices_with_items(auth.user_id, CONTEXT_INVOICE_LIMIT)
            .await?;
        let context = invoice_context(&invoices);

        let history: Vec<ChatTurn> = resources
            .database
            .get_recent_chat_messages(auth.user_id, HISTORY_TURN_LIMIT)
            .await?
            .into_iter()
            .map(|message| ChatTurn {
                role: if message.role == "assistant" {
                    MessageRole::Assistant
                } else {
                    MessageRole::User
                },
                content: message.content,
            })
            .collect();

        let reply = resources
            .extractor
            .converse(&request.message, &context, &history)
            .await?;

        // Both turns are persisted only after a successful reply so a
        // failed generation leaves the history untouched.
        resources
            .database
            .add_chat_message(auth.user_id, "user", &request.message, None)
            .await?;
        resources
            .database
            .add_chat_message(auth.user_id, "assistant", &reply, None)
            .await?;

        Ok(Json(ChatResponse {
            message: reply,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }))
    }

    async fn get_history(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<HistoryQuery>,
    ) -> Result<Json<ChatHistoryResponse>, AppError> {
        let auth = resources.auth_manager.authenticate_headers(&headers)?;

        let history = resources
            .database
            .get_chat_history(auth.user_id, query.limit)
            .await?;

        Ok(Json(ChatHistoryResponse {
            count: history.len(),
            history,
        }))
    }

    async fn clear_history(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let auth = resources.auth_manager.authenticate_headers(&headers)?;

        resources.database.clear_chat_history(auth.user_id).await?;

        Ok(Json(json!({
            "message": "Chat history cleared successfully"
        })))
    }
}

/// Condense invoices into the JSON shape embedded in the system prompt
fn invoice_context(invoices: &[Invoice]) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = invoices
        .iter()
        .map(|invoice| {
            json!({
                "id": invoice.id,
                "vendor_name": invoice.vendor_name,
                "invoice_number": invoice.invoice_number,
                "invoice_date": invoice.invoice_date,
                "total_amount": invoice.total_amount,
                "tax_amount": invoice.tax_amount,
                "category": invoice.category,
                "currency": invoice.currency,
                "items": invoice
                    .line_items
                    .iter()
                    .map(|item| {
                        json!({
                            "description": item.description,
                            "quantity": item.quantity,
                            "unit_price": item.unit_price,
                            "total_price": item.total_price,
                        })
                    })
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    serde_json::Value::Array(entries)
}
