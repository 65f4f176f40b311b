// ABOUTME: AI provider abstraction for document extraction, categorization, and chat
// ABOUTME: Parses model replies into the typed extraction payload

//! # AI Integration
//!
//! [`DocumentExtractor`] is the seam between the ingestion pipeline and
//! the AI provider. The shipped implementation is
//! [`anthropic::AnthropicProvider`]; tests substitute a stub.

pub mod anthropic;
pub mod prompts;

pub use anthropic::AnthropicProvider;

use crate::errors::{AppError, AppResult};
use crate::models::ExtractedInvoice;
use async_trait::async_trait;

/// Speaker role for one conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of conversation history replayed to the model
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

/// Extraction output: the typed payload plus the raw JSON the model produced
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub invoice: ExtractedInvoice,
    pub raw: serde_json::Value,
}

/// AI operations used by the ingestion pipeline and the chat assistant
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Extract structured invoice data from a document
    async fn extract(&self, bytes: &[u8], mime: &str) -> AppResult<ExtractionResult>;

    /// Assign a spending category; never fails, falling back to "Other"
    async fn categorize(&self, vendor: &str, items: &[String]) -> String;

    /// Generate an assistant reply grounded in the user's invoice data
    async fn converse(
        &self,
        message: &str,
        invoice_context: &serde_json::Value,
        history: &[ChatTurn],
    ) -> AppResult<String>;
}

/// Parse a model extraction reply into a validated payload.
///
/// Models sometimes wrap JSON in Markdown code fences despite being told
/// not to; those are stripped before parsing.
///
/// # Errors
///
/// Returns `ExtractionFailed` when the reply is not valid JSON, does not
/// match the expected shape, or lacks `total_amount`.
pub fn parse_extraction_reply(text: &str) -> AppResult<ExtractionResult> {
    let cleaned = strip_code_fences(text);

    let raw: serde_json::Value = serde_json::from_str(cleaned).map_err(|e| {
        AppError::extraction(format!("model reply is not valid JSON: {e}"))
    })?;
    let invoice: ExtractedInvoice = serde_json::from_value(raw.clone()).map_err(|e| {
        AppError::extraction(format!("model reply has unexpected shape: {e}"))
    })?;
    invoice.validate()?;

    Ok(ExtractionResult { invoice, raw })
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line, then the closing fence
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .trim_end_matches('`')
        .trim()
}
