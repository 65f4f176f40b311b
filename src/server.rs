// ABOUTME: HTTP server assembly wiring shared resources, routes, and middleware
// ABOUTME: Handles startup, CORS, body limits, and graceful shutdown

//! # Server Assembly
//!
//! [`ServerResources`] owns every shared dependency once; route modules
//! receive it as axum state. The router mounts all API surfaces under
//! `/api` plus a public `/health`.

use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::database::Database;
use crate::errors::AppError;
use crate::llm::DocumentExtractor;
use crate::routes::{
    AnalyticsRoutes, AuthRoutes, ChatRoutes, FileRoutes, HealthRoutes, InvoiceRoutes,
};
use crate::storage::LocalObjectStore;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Maximum upload size accepted by the API
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared dependencies for all request handlers
pub struct ServerResources {
    pub database: Arc<Database>,
    pub auth_manager: Arc<AuthManager>,
    pub object_store: Arc<LocalObjectStore>,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub config: Arc<ServerConfig>,
}

impl ServerResources {
    #[must_use]
    pub fn new(
        database: Database,
        auth_manager: AuthManager,
        object_store: LocalObjectStore,
        extractor: Arc<dyn DocumentExtractor>,
        config: ServerConfig,
    ) -> Self {
        Self {
            database: Arc::new(database),
            auth_manager: Arc::new(auth_manager),
            object_store: Arc::new(object_store),
            extractor,
            config: Arc::new(config),
        }
    }
}

/// The Invoice Insights HTTP server
pub struct InvoiceInsightsServer {
    resources: Arc<ServerResources>,
}

impl InvoiceInsightsServer {
    #[must_use]
    pub fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Assemble the full application router
    #[must_use]
    pub fn router(&self) -> Router {
        let cors = match self.resources.config.cors_origin.as_deref() {
            Some(origin) => match origin.parse::<axum::http::HeaderValue>() {
                Ok(origin) => CorsLayer::new()
                    .allow_origin(origin)
                    .allow_methods(Any)
                    .allow_headers([AUTHORIZATION, CONTENT_TYPE]),
                Err(_) => {
                    warn!("FRONTEND_URL is not a valid origin, allowing any");
                    permissive_cors()
                }
            },
            None => permissive_cors(),
        };

        Router::new()
            .merge(HealthRoutes::routes())
            .merge(AuthRoutes::routes(self.resources.clone()))
            .merge(InvoiceRoutes::routes(self.resources.clone()))
            .merge(ChatRoutes::routes(self.resources.clone()))
            .merge(AnalyticsRoutes::routes(self.resources.clone()))
            .merge(FileRoutes::routes(self.resources.clone()))
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until shutdown, then close the database pool
    ///
    /// # Errors
    ///
    /// Returns an error if binding or serving fails.
    pub async fn run(self, port: u16) -> Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;

        info!(port, "Invoice Insights API listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        info!("shutting down, closing database pool");
        self.resources.database.close().await;

        Ok(())
    }
}

fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received ctrl-c"),
        Err(e) => {
            let err = AppError::internal(format!("failed to install signal handler: {e}"));
            warn!("{err}");
        }
    }
}
