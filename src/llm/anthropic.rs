// ABOUTME: Anthropic Messages API client for vision extraction, categorization, and chat
// ABOUTME: Encodes documents as base64 content blocks and maps failures to pipeline errors

//! # Anthropic Provider
//!
//! Implementation of [`DocumentExtractor`](super::DocumentExtractor)
//! against the Anthropic Messages API. PDFs are sent as `document`
//! content blocks and images as `image` blocks, both base64-encoded,
//! followed by the fixed extraction prompt.

use super::{parse_extraction_reply, prompts, ChatTurn, DocumentExtractor, ExtractionResult};
use crate::config::AnthropicConfig;
use crate::errors::{AppError, AppResult};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default model for extraction and chat
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Messages API endpoint
const API_URL: &str = "https://api.anthropic.com/v1/messages";

/// API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Token budgets per operation
const EXTRACT_MAX_TOKENS: u32 = 2000;
const CHAT_MAX_TOKENS: u32 = 1000;
const CATEGORIZE_MAX_TOKENS: u32 = 50;

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: MediaSource },
    Document { source: MediaSource },
}

#[derive(Debug, Serialize)]
struct MediaSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

// ============================================================================
// Provider
// ============================================================================

/// Anthropic Messages API client
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl AnthropicProvider {
    /// Create a provider from configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the API key is absent or the HTTP
    /// client fails to build.
    pub fn new(config: &AnthropicConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::config("ANTHROPIC_API_KEY environment variable is required"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::config("failed to build HTTP client").with_source(e))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
        })
    }

    /// Send a request and return the concatenated text reply
    async fn send(&self, request: &MessagesRequest) -> Result<String> {
        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await
            .context("request to Anthropic API failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Anthropic API returned {status}: {body}"));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("failed to decode Anthropic API response")?;

        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text.as_str())
            .collect();

        if text.is_empty() {
            return Err(anyhow!("Anthropic API response contained no text"));
        }

        Ok(text)
    }
}

#[async_trait]
impl DocumentExtractor for AnthropicProvider {
    async fn extract(&self, bytes: &[u8], mime: &str) -> AppResult<ExtractionResult> {
        let media_type = normalize_media_type(mime);
        let source = MediaSource {
            source_type: "base64",
            media_type: media_type.to_owned(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        };

        let file_block = if media_type == "application/pdf" {
            ContentBlock::Document { source }
        } else {
            ContentBlock::Image { source }
        };

        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: EXTRACT_MAX_TOKENS,
            system: None,
            messages: vec![WireMessage {
                role: "user",
                content: vec![
                    file_block,
                    ContentBlock::Text {
                        text: prompts::EXTRACTION_PROMPT.to_owned(),
                    },
                ],
            }],
        };

        debug!(media_type, size = bytes.len(), "extracting invoice data");
        let reply = self
            .send(&request)
            .await
            .map_err(|e| AppError::extraction(e.to_string()))?;

        parse_extraction_reply(&reply)
    }

    async fn categorize(&self, vendor: &str, items: &[String]) -> String {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: CATEGORIZE_MAX_TOKENS,
            system: None,
            messages: vec![WireMessage {
                role: "user",
                content: vec![ContentBlock::Text {
                    text: prompts::categorize_prompt(vendor, items),
                }],
            }],
        };

        match self.send(&request).await {
            Ok(reply) => prompts::normalize_category(&reply).to_owned(),
            Err(e) => {
                warn!(vendor, "categorization failed, using fallback: {e}");
                prompts::FALLBACK_CATEGORY.to_owned()
            }
        }
    }

    async fn converse(
        &self,
        message: &str,
        invoice_context: &serde_json::Value,
        history: &[ChatTurn],
    ) -> AppResult<String> {
        let mut messages: Vec<WireMessage> = history
            .iter()
            .map(|turn| WireMessage {
                role: turn.role.as_str(),
                content: vec![ContentBlock::Text {
                    text: turn.content.clone(),
                }],
            })
            .collect();
        messages.push(WireMessage {
            role: "user",
            content: vec![ContentBlock::Text {
                text: message.to_owned(),
            }],
        });

        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: CHAT_MAX_TOKENS,
            system: Some(prompts::assistant_system_prompt(invoice_context)),
            messages,
        };

        self.send(&request)
            .await
            .map_err(|e| AppError::chat_generation(e.to_string()))
    }
}

/// Map an arbitrary MIME type onto one the Messages API accepts
fn normalize_media_type(mime: &str) -> &'static str {
    let mime = mime.to_ascii_lowercase();
    if mime.contains("png") {
        "image/png"
    } else if mime.contains("pdf") {
        "application/pdf"
    } else if mime.contains("webp") {
        "image/webp"
    } else if mime.contains("gif") {
        "image/gif"
    } else {
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_normalization() {
        assert_eq!(normalize_media_type("application/pdf"), "application/pdf");
        assert_eq!(normalize_media_type("image/png"), "image/png");
        assert_eq!(normalize_media_type("IMAGE/WEBP"), "image/webp");
        assert_eq!(normalize_media_type("image/jpeg"), "image/jpeg");
        assert_eq!(normalize_media_type("application/octet-stream"), "image/jpeg");
    }

    #[test]
    fn test_content_block_wire_format() {
        let block = ContentBlock::Image {
            source: MediaSource {
                source_type: "base64",
                media_type: "image/png".into(),
                data: "AAAA".into(),
            },
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["source"]["type"], "base64");
        assert_eq!(json["source"]["media_type"], "image/png");

        let block = ContentBlock::Document {
            source: MediaSource {
                source_type: "base64",
                media_type: "application/pdf".into(),
                data: "AAAA".into(),
            },
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "document");
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let err = AnthropicProvider::new(&crate::config::AnthropicConfig {
            api_key: None,
            model: DEFAULT_MODEL.into(),
            request_timeout_secs: 10,
        })
        .unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::ConfigError);
    }
}
