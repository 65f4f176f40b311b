// ABOUTME: Server binary entry point for the Invoice Insights API
// ABOUTME: Loads configuration, wires resources, and runs the HTTP server

use anyhow::Result;
use clap::Parser;
use invoice_insights::auth::AuthManager;
use invoice_insights::config::ServerConfig;
use invoice_insights::database::Database;
use invoice_insights::llm::{AnthropicProvider, DocumentExtractor};
use invoice_insights::logging;
use invoice_insights::server::{InvoiceInsightsServer, ServerResources};
use invoice_insights::storage::LocalObjectStore;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "invoice-insights-server")]
#[command(about = "AI-powered invoice ingestion and analytics API")]
#[command(version)]
struct Args {
    /// HTTP port (overrides the PORT environment variable)
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    config.summary();

    // Fail fast without an API key; every upload would fail anyway
    let extractor: Arc<dyn DocumentExtractor> = Arc::new(AnthropicProvider::new(&config.anthropic)?);

    let database = Database::new(&config.database.url).await?;
    let auth_manager = AuthManager::new(&config.auth.jwt_secret, config.auth.jwt_expiry_hours);
    let object_store = LocalObjectStore::new(&config.storage);

    let port = config.http_port;
    let resources = Arc::new(ServerResources::new(
        database,
        auth_manager,
        object_store,
        extractor,
        config,
    ));

    InvoiceInsightsServer::new(resources).run(port).await
}
