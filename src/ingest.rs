// ABOUTME: Invoice ingestion pipeline orchestrating storage, extraction, and persistence
// ABOUTME: Drives the staged state machine with per-stage failure policy

//! # Ingestion Pipeline
//!
//! One uploaded document flows through
//! `Received → Stored → Extracted → Categorized → Persisted → Complete`.
//! Each stage has a distinct failure policy: storage and extraction
//! failures abort the pipeline (an extraction failure leaves the stored
//! file orphaned rather than risking a delete of good data),
//! categorization never fails, and persistence is a single transaction.

use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::llm::DocumentExtractor;
use crate::models::{Invoice, LineItem};
use crate::storage::ObjectStore;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Stages of the ingestion state machine, used for logging and error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Stored,
    Extracted,
    Categorized,
    Persisted,
    Complete,
    Aborted,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Stored => "stored",
            Self::Extracted => "extracted",
            Self::Categorized => "categorized",
            Self::Persisted => "persisted",
            Self::Complete => "complete",
            Self::Aborted => "aborted",
        };
        write!(f, "{name}")
    }
}

/// Result of a completed ingestion run
#[derive(Debug, Clone)]
pub struct IngestionOutcome {
    /// The persisted invoice with its line items
    pub invoice: Invoice,
    /// The raw extraction payload, as returned to the client
    pub extracted: serde_json::Value,
}

/// Drives one document from upload to persisted invoice
pub struct IngestionPipeline {
    database: Arc<Database>,
    store: Arc<dyn ObjectStore>,
    extractor: Arc<dyn DocumentExtractor>,
}

impl IngestionPipeline {
    #[must_use]
    pub fn new(
        database: Arc<Database>,
        store: Arc<dyn ObjectStore>,
        extractor: Arc<dyn DocumentExtractor>,
    ) -> Self {
        Self {
            database,
            store,
            extractor,
        }
    }

    /// Run the full pipeline for one uploaded document.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable`, `ExtractionFailed`, or
    /// `PersistenceFailed` depending on the stage that aborted.
    pub async fn run(
        &self,
        user_id: Uuid,
        file_name: &str,
        mime: &str,
        bytes: &[u8],
    ) -> AppResult<IngestionOutcome> {
        debug!(
            user_id = %user_id,
            file_name,
            mime,
            size = bytes.len(),
            stage = %PipelineStage::Received,
            "ingestion started"
        );

        let stored = self
            .store
            .store(bytes, file_name, mime, user_id)
            .await
            .map_err(|e| abort(PipelineStage::Stored, e))?;
        debug!(key = %stored.key, stage = %PipelineStage::Stored, "file stored");

        // An extraction failure leaves the stored file in place; a later
        // retry can reuse it and an orphan is cheaper than a lost upload.
        let extraction = self
            .extractor
            .extract(bytes, mime)
            .await
            .map_err(|e| abort(PipelineStage::Extracted, e))?;
        let total_amount = extraction.invoice.validate()?;
        debug!(
            vendor = extraction.invoice.vendor(),
            total_amount,
            stage = %PipelineStage::Extracted,
            "invoice data extracted"
        );

        // The model's own category wins when it assigned one; otherwise a
        // dedicated classification call fills it in, never failing.
        let mut metadata = extraction.raw.clone();
        let category = match extraction.invoice.category.as_deref() {
            Some(c) if !c.trim().is_empty() => c.to_owned(),
            _ => {
                let item_descriptions: Vec<String> = extraction
                    .invoice
                    .items()
                    .iter()
                    .map(|item| item.description.clone())
                    .collect();
                let assigned = self
                    .extractor
                    .categorize(extraction.invoice.vendor(), &item_descriptions)
                    .await;
                if let Some(object) = metadata.as_object_mut() {
                    object.insert(
                        "category".into(),
                        serde_json::Value::String(assigned.clone()),
                    );
                }
                assigned
            }
        };
        debug!(category, stage = %PipelineStage::Categorized, "invoice categorized");

        let now = Utc::now();
        let invoice_id = Uuid::new_v4();
        let line_items: Vec<LineItem> = extraction
            .invoice
            .items()
            .iter()
            .map(|item| LineItem {
                id: Uuid::new_v4(),
                invoice_id,
                description: item.description.clone(),
                quantity: item.quantity_or_one(),
                unit_price: item.unit_price,
                total_price: item.total(),
                category: item.category.clone(),
                created_at: now,
            })
            .collect();

        let invoice = Invoice {
            id: invoice_id,
            user_id,
            vendor_name: extraction.invoice.vendor().to_owned(),
            invoice_number: extraction.invoice.invoice_number.clone(),
            invoice_date: extraction.invoice.invoice_date,
            due_date: extraction.invoice.due_date,
            total_amount,
            tax_amount: extraction.invoice.tax(),
            subtotal: extraction.invoice.subtotal,
            currency: extraction.invoice.currency_or_default().to_owned(),
            category: Some(category),
            status: "pending".into(),
            file_url: Some(stored.url),
            file_type: Some(mime.to_owned()),
            storage_key: Some(stored.key),
            metadata: Some(metadata),
            created_at: now,
            updated_at: now,
            line_items,
        };

        self.database
            .create_invoice_with_items(&invoice)
            .await
            .map_err(|e| abort(PipelineStage::Persisted, e))?;

        info!(
            invoice_id = %invoice.id,
            user_id = %user_id,
            vendor = %invoice.vendor_name,
            total_amount = invoice.total_amount,
            items = invoice.line_items.len(),
            stage = %PipelineStage::Complete,
            "invoice ingested"
        );

        Ok(IngestionOutcome {
            extracted: invoice
                .metadata
                .clone()
                .unwrap_or(serde_json::Value::Null),
            invoice,
        })
    }
}

fn abort(stage: PipelineStage, error: AppError) -> AppError {
    warn!(
        stage = %stage,
        code = ?error.code,
        outcome = %PipelineStage::Aborted,
        "ingestion aborted: {}",
        error.message
    );
    error
}
