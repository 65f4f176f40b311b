// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing

//! Environment-based configuration management

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Environment type for configuration defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Object storage configuration
    pub storage: StorageConfig,
    /// Anthropic API configuration
    pub anthropic: AnthropicConfig,
    /// Allowed CORS origin for the frontend (any origin when unset)
    pub cors_origin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite path or `sqlite::memory:`)
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for HS256 token signing
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// Token validity in hours
    pub jwt_expiry_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for stored invoice files
    pub root: PathBuf,
    /// Base URL prepended to download paths (scheme + host + port)
    pub public_base_url: String,
    /// Secret for HMAC download URL signing
    #[serde(skip_serializing)]
    pub url_signing_secret: String,
    /// Default signed URL validity in seconds
    pub signed_url_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key (the server refuses to start without one)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Model identifier for extraction and chat
    pub model: String,
    /// Upstream request timeout in seconds
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when a required variable is absent or a
    /// numeric variable fails to parse.
    pub fn from_env() -> AppResult<Self> {
        let environment = Environment::from_str_or_default(
            &env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        );

        let http_port = parse_env_u16("PORT", 8080)?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| {
            AppError::config("JWT_SECRET environment variable is required")
        })?;

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{http_port}"));

        // Download URL signing falls back to the JWT secret so a minimal
        // deployment only needs one secret configured.
        let url_signing_secret = match env::var("STORAGE_SIGNING_SECRET") {
            Ok(secret) => secret,
            Err(_) => {
                warn!("STORAGE_SIGNING_SECRET not set, reusing JWT_SECRET for URL signing");
                jwt_secret.clone()
            }
        };

        let config = Self {
            http_port,
            environment,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:./data/invoice-insights.db".into()),
            },
            auth: AuthConfig {
                jwt_secret,
                jwt_expiry_hours: parse_env_i64("JWT_EXPIRY_HOURS", 7 * 24)?,
            },
            storage: StorageConfig {
                root: PathBuf::from(
                    env::var("STORAGE_ROOT").unwrap_or_else(|_| "./data/uploads".into()),
                ),
                public_base_url,
                url_signing_secret,
                signed_url_ttl_secs: parse_env_u64("SIGNED_URL_TTL_SECS", 3600)?,
            },
            anthropic: AnthropicConfig {
                api_key: env::var("ANTHROPIC_API_KEY").ok(),
                model: env::var("ANTHROPIC_MODEL")
                    .unwrap_or_else(|_| crate::llm::anthropic::DEFAULT_MODEL.into()),
                request_timeout_secs: parse_env_u64("ANTHROPIC_TIMEOUT_SECS", 120)?,
            },
            cors_origin: env::var("FRONTEND_URL").ok(),
        };

        Ok(config)
    }

    /// Log a startup summary without secrets
    pub fn summary(&self) {
        info!(
            http.port = self.http_port,
            environment = %self.environment,
            database.url = %self.database.url,
            storage.root = %self.storage.root.display(),
            anthropic.model = %self.anthropic.model,
            anthropic.key_present = self.anthropic.api_key.is_some(),
            cors.origin = self.cors_origin.as_deref().unwrap_or("*"),
            "Configuration loaded"
        );
    }
}

fn parse_env_u16(name: &str, default: u16) -> AppResult<u16> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::config(format!("{name} must be a valid port number"))),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::config(format!("{name} must be a non-negative integer"))),
        Err(_) => Ok(default),
    }
}

fn parse_env_i64(name: &str, default: i64) -> AppResult<i64> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::config(format!("{name} must be an integer"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from_str_or_default("prod"),
            Environment::Production
        );
        assert_eq!(
            Environment::from_str_or_default("TEST"),
            Environment::Testing
        );
        assert_eq!(
            Environment::from_str_or_default("anything"),
            Environment::Development
        );
        assert!(Environment::Production.is_production());
    }
}
