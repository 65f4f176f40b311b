// ABOUTME: Invoice route handlers for upload, listing, retrieval, update, and deletion
// ABOUTME: Drives the ingestion pipeline and serves owner-scoped invoice data

use crate::database::InvoiceFilter;
use crate::errors::{AppError, AppResult};
use crate::ingest::IngestionPipeline;
use crate::models::Invoice;
use crate::server::ServerResources;
use crate::storage::ObjectStore;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// Signed URL validity when refreshing a single invoice's file link
const REFRESH_URL_TTL: Duration = Duration::from_secs(3600);

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query filters for invoice listing
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListInvoicesQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category: Option<String>,
    pub vendor: Option<String>,
}

/// Response for invoice listing
#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<Invoice>,
    pub count: usize,
}

/// Response after a successful upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub invoice: Invoice,
    pub extracted_data: serde_json::Value,
}

/// Partial update to an invoice
#[derive(Debug, Deserialize, Default)]
pub struct UpdateInvoiceRequest {
    pub category: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Response after an update
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateInvoiceResponse {
    pub message: String,
    pub invoice: Invoice,
}

// ============================================================================
// Routes
// ============================================================================

/// Invoice routes handler
pub struct InvoiceRoutes;

impl InvoiceRoutes {
    /// Create all invoice routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/invoices/upload", post(Self::upload))
            .route("/api/invoices", get(Self::list))
            .route("/api/invoices/:id", get(Self::get_one))
            .route("/api/invoices/:id", put(Self::update))
            .route("/api/invoices/:id", delete(Self::delete_one))
            .with_state(resources)
    }

    async fn upload(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        mut multipart: Multipart,
    ) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
        let auth = resources.auth_manager.authenticate_headers(&headers)?;

        let mut upload: Option<(String, String, Vec<u8>)> = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::invalid_input(format!("malformed multipart body: {e}")))?
        {
            if field.name() != Some("invoice") {
                continue;
            }
            let file_name = field.file_name().unwrap_or("upload").to_owned();
            let mime = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::invalid_input(format!("failed to read upload: {e}")))?;
            upload = Some((file_name, mime, bytes.to_vec()));
            break;
        }

        let Some((file_name, mime, bytes)) = upload else {
            return Err(AppError::missing_field("No invoice file uploaded"));
        };

        let pipeline = IngestionPipeline::new(
            resources.database.clone(),
            resources.object_store.clone(),
            resources.extractor.clone(),
        );
        let outcome = pipeline
            .run(auth.user_id, &file_name, &mime, &bytes)
            .await?;

        Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                message: "Invoice processed successfully".into(),
                invoice: outcome.invoice,
                extracted_data: outcome.extracted,
            }),
        ))
    }

    async fn list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<ListInvoicesQuery>,
    ) -> Result<Json<InvoiceListResponse>, AppError> {
        let auth = resources.auth_manager.authenticate_headers(&headers)?;

        let filter = InvoiceFilter {
            start_date: parse_date_param("startDate", query.start_date.as_deref())?,
            end_date: parse_date_param("endDate", query.end_date.as_deref())?,
            category: query.category,
            vendor: query.vendor,
        };

        let invoices = resources
            .database
            .list_invoices(auth.user_id, &filter)
            .await?;

        Ok(Json(InvoiceListResponse {
            count: invoices.len(),
            invoices,
        }))
    }

    async fn get_one(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<Uuid>,
    ) -> Result<Json<Invoice>, AppError> {
        let auth = resources.auth_manager.authenticate_headers(&headers)?;

        let mut invoice = resources
            .database
            .get_invoice(auth.user_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Invoice"))?;

        // Refresh the download link so stale signatures never reach clients
        if let Some(key) = &invoice.storage_key {
            invoice.file_url = Some(resources.object_store.signed_url(key, REFRESH_URL_TTL));
        }

        Ok(Json(invoice))
    }

    async fn update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<Uuid>,
        Json(request): Json<UpdateInvoiceRequest>,
    ) -> Result<Json<UpdateInvoiceResponse>, AppError> {
        let auth = resources.auth_manager.authenticate_headers(&headers)?;

        if request.category.is_none() && request.status.is_none() && request.notes.is_none() {
            return Err(AppError::invalid_input("No updates provided"));
        }

        let invoice = resources
            .database
            .update_invoice(
                auth.user_id,
                id,
                request.category.as_deref(),
                request.status.as_deref(),
                request.notes.as_deref(),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Invoice"))?;

        Ok(Json(UpdateInvoiceResponse {
            message: "Invoice updated successfully".into(),
            invoice,
        }))
    }

    async fn delete_one(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<Uuid>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let auth = resources.auth_manager.authenticate_headers(&headers)?;

        let invoice = resources
            .database
            .get_invoice(auth.user_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Invoice"))?;

        // Best effort: a failed storage delete must not block the row delete
        if let Some(key) = &invoice.storage_key {
            if let Err(e) = resources.object_store.remove(key).await {
                warn!(key, "failed to remove stored file: {e}");
            }
        }

        resources.database.delete_invoice(auth.user_id, id).await?;

        Ok(Json(serde_json::json!({
            "message": "Invoice deleted successfully"
        })))
    }
}

fn parse_date_param(name: &str, raw: Option<&str>) -> AppResult<Option<NaiveDate>> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| AppError::invalid_input(format!("{name} must be YYYY-MM-DD")))
    })
    .transpose()
}
