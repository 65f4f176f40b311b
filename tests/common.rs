// ABOUTME: Shared test fixtures for integration tests
// ABOUTME: Builds an in-memory server environment with a stubbed AI provider

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use invoice_insights::auth::AuthManager;
use invoice_insights::config::{
    AnthropicConfig, AuthConfig, DatabaseConfig, Environment, ServerConfig, StorageConfig,
};
use invoice_insights::database::Database;
use invoice_insights::errors::{AppError, AppResult};
use invoice_insights::llm::{
    parse_extraction_reply, ChatTurn, DocumentExtractor, ExtractionResult,
};
use invoice_insights::models::{Invoice, LineItem, User};
use invoice_insights::server::{InvoiceInsightsServer, ServerResources};
use invoice_insights::storage::LocalObjectStore;
use std::sync::Arc;
use std::sync::Mutex;
use uuid::Uuid;

/// Stubbed AI provider with configurable behavior per operation
pub struct StubExtractor {
    /// Extraction payload returned by `extract`; None makes extraction fail
    pub payload: Option<serde_json::Value>,
    /// Category returned by `categorize`
    pub category: String,
    /// Reply returned by `converse`; None makes chat generation fail
    pub chat_reply: Option<String>,
    /// Conversation turns observed by `converse`, for assertions
    pub seen_history: Mutex<Vec<usize>>,
}

impl Default for StubExtractor {
    fn default() -> Self {
        Self {
            payload: Some(sample_extraction()),
            category: "Software".into(),
            chat_reply: Some("You spent $540.00 in total.".into()),
            seen_history: Mutex::new(Vec::new()),
        }
    }
}

impl StubExtractor {
    pub fn failing_extraction() -> Self {
        Self {
            payload: None,
            ..Self::default()
        }
    }

    pub fn failing_chat() -> Self {
        Self {
            chat_reply: None,
            ..Self::default()
        }
    }

    pub fn with_payload(payload: serde_json::Value) -> Self {
        Self {
            payload: Some(payload),
            ..Self::default()
        }
    }
}

#[async_trait]
impl DocumentExtractor for StubExtractor {
    async fn extract(&self, _bytes: &[u8], _mime: &str) -> AppResult<ExtractionResult> {
        match &self.payload {
            Some(payload) => parse_extraction_reply(&payload.to_string()),
            None => Err(AppError::extraction("upstream unavailable")),
        }
    }

    async fn categorize(&self, _vendor: &str, _items: &[String]) -> String {
        self.category.clone()
    }

    async fn converse(
        &self,
        _message: &str,
        _invoice_context: &serde_json::Value,
        history: &[ChatTurn],
    ) -> AppResult<String> {
        self.seen_history
            .lock()
            .expect("history lock poisoned")
            .push(history.len());
        self.chat_reply
            .clone()
            .ok_or_else(|| AppError::chat_generation("upstream unavailable"))
    }
}

/// A fully wired in-memory server environment
pub struct TestEnv {
    pub resources: Arc<ServerResources>,
    /// Direct handle to the stub for observing calls
    pub stub: Arc<StubExtractor>,
    storage_dir: tempfile::TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_extractor(StubExtractor::default()).await
    }

    pub async fn with_extractor(extractor: StubExtractor) -> Self {
        let stub = Arc::new(extractor);
        let storage_dir = tempfile::tempdir().expect("failed to create temp dir");

        let config = ServerConfig {
            http_port: 0,
            environment: Environment::Testing,
            database: DatabaseConfig {
                url: "sqlite::memory:".into(),
            },
            auth: AuthConfig {
                jwt_secret: "test-jwt-secret".into(),
                jwt_expiry_hours: 24,
            },
            storage: StorageConfig {
                root: storage_dir.path().to_path_buf(),
                public_base_url: "http://localhost:8080".into(),
                url_signing_secret: "test-signing-secret".into(),
                signed_url_ttl_secs: 3600,
            },
            anthropic: AnthropicConfig {
                api_key: None,
                model: "stub".into(),
                request_timeout_secs: 5,
            },
            cors_origin: None,
        };

        let database = Database::new(&config.database.url)
            .await
            .expect("failed to open test database");
        let auth_manager = AuthManager::new(&config.auth.jwt_secret, config.auth.jwt_expiry_hours);
        let object_store = LocalObjectStore::new(&config.storage);

        let resources = Arc::new(ServerResources::new(
            database,
            auth_manager,
            object_store,
            stub.clone(),
            config,
        ));

        Self {
            resources,
            stub,
            storage_dir,
        }
    }

    /// Build the full application router
    pub fn router(&self) -> axum::Router {
        InvoiceInsightsServer::new(self.resources.clone()).router()
    }

    /// Create a user directly in the database and issue a token.
    ///
    /// Uses a low bcrypt cost; the password is always `password123`.
    pub async fn create_user(&self, email: &str) -> (User, String) {
        let hash = bcrypt::hash("password123", 4).expect("failed to hash password");
        let user = User::new(email.into(), hash, Some("Test User".into()));
        self.resources
            .database
            .create_user(&user)
            .await
            .expect("failed to create test user");
        let token = self
            .resources
            .auth_manager
            .generate_token(&user)
            .expect("failed to generate token");
        (user, token)
    }

    /// Seed one invoice with optional line items, bypassing the pipeline
    pub async fn seed_invoice(
        &self,
        user_id: Uuid,
        vendor: &str,
        total: f64,
        tax: f64,
        category: Option<&str>,
        date: Option<NaiveDate>,
        items: &[(&str, f64)],
    ) -> Invoice {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let invoice = Invoice {
            id,
            user_id,
            vendor_name: vendor.into(),
            invoice_number: None,
            invoice_date: date,
            due_date: None,
            total_amount: total,
            tax_amount: tax,
            subtotal: None,
            currency: "USD".into(),
            category: category.map(Into::into),
            status: "pending".into(),
            file_url: None,
            file_type: None,
            storage_key: None,
            metadata: None,
            created_at: now,
            updated_at: now,
            line_items: items
                .iter()
                .map(|(description, price)| LineItem {
                    id: Uuid::new_v4(),
                    invoice_id: id,
                    description: (*description).into(),
                    quantity: 1.0,
                    unit_price: Some(*price),
                    total_price: *price,
                    category: None,
                    created_at: now,
                })
                .collect(),
        };

        self.resources
            .database
            .create_invoice_with_items(&invoice)
            .await
            .expect("failed to seed invoice");
        invoice
    }
}

/// A well-formed extraction payload for a two-item invoice
pub fn sample_extraction() -> serde_json::Value {
    serde_json::json!({
        "vendor_name": "Acme Corp",
        "invoice_number": "INV-2024-001",
        "invoice_date": "2024-03-15",
        "due_date": "2024-04-14",
        "total_amount": 540.0,
        "tax_amount": 40.0,
        "subtotal": 500.0,
        "currency": "USD",
        "line_items": [
            { "description": "Widget licenses", "quantity": 10, "unit_price": 30.0, "total_price": 300.0 },
            { "description": "Support plan", "quantity": 1, "unit_price": 200.0, "total_price": 200.0 }
        ]
    })
}
