// ABOUTME: Signed file download route for stored invoice documents
// ABOUTME: Authenticates by URL signature and expiry instead of bearer tokens

use crate::errors::AppError;
use crate::server::ServerResources;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;

/// Signature parameters carried in the download URL
#[derive(Debug, Deserialize)]
pub struct SignedUrlQuery {
    pub expires: u64,
    pub sig: String,
}

/// File download routes handler
pub struct FileRoutes;

impl FileRoutes {
    /// Create the signed download route
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/files/*key", get(Self::download))
            .with_state(resources)
    }

    async fn download(
        State(resources): State<Arc<ServerResources>>,
        Path(key): Path<String>,
        Query(query): Query<SignedUrlQuery>,
    ) -> Result<Response, AppError> {
        resources
            .object_store
            .verify(&key, query.expires, &query.sig)?;

        let bytes = resources.object_store.load(&key).await?;
        let content_type = content_type_for(&key);

        Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
    }
}

fn content_type_for(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
