// ABOUTME: JWT token generation and validation for API authentication
// ABOUTME: Extracts and verifies bearer tokens from HTTP request headers

//! # Authentication
//!
//! HS256 JWT authentication. Tokens carry the user id and email and are
//! valid for seven days by default. Every protected route authenticates
//! the `Authorization: Bearer` header through [`AuthManager`].

use crate::errors::{AppError, AppResult};
use crate::models::User;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for API tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID (UUID string)
    pub sub: String,
    /// User email
    pub email: String,
    /// Issued-at (Unix timestamp)
    pub iat: i64,
    /// Expiry (Unix timestamp)
    pub exp: i64,
}

/// The identity attached to an authenticated request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Issues and validates API tokens
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_hours: i64,
}

impl AuthManager {
    /// Create a manager from a shared HS256 secret
    #[must_use]
    pub fn new(secret: &str, token_expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_expiry_hours,
        }
    }

    /// Generate a token for the given user
    ///
    /// # Errors
    ///
    /// Returns an internal error if token encoding fails.
    pub fn generate_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.token_expiry_hours)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal("failed to encode token").with_source(e))
    }

    /// Validate a token and return its claims
    ///
    /// # Errors
    ///
    /// Returns `AuthExpired` for expired tokens and `AuthInvalid` for any
    /// other validation failure.
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::auth_expired(),
                _ => AppError::auth_invalid("Invalid authentication token"),
            })
    }

    /// Authenticate a request from its headers
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` when the bearer header is absent or
    /// malformed, and the `validate_token` errors otherwise.
    pub fn authenticate_headers(&self, headers: &HeaderMap) -> AppResult<AuthenticatedUser> {
        let token = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(AppError::auth_required)?;

        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::auth_invalid("Invalid user ID in token"))?;

        Ok(AuthenticatedUser {
            user_id,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User::new(
            "test@example.com".into(),
            "hash".into(),
            Some("Test User".into()),
        )
    }

    #[test]
    fn test_token_round_trip() {
        let manager = AuthManager::new("test-secret", 24);
        let user = test_user();
        let token = manager.generate_token(&user).unwrap();

        let claims = manager.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let manager = AuthManager::new("secret-a", 24);
        let other = AuthManager::new("secret-b", 24);
        let token = manager.generate_token(&test_user()).unwrap();

        let err = other.validate_token(&token).unwrap_err();
        assert_eq!(err.http_status(), 401);
    }

    #[test]
    fn test_expired_token_maps_to_auth_expired() {
        let manager = AuthManager::new("test-secret", -1);
        let token = manager.generate_token(&test_user()).unwrap();

        let err = manager.validate_token(&token).unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::AuthExpired);
    }

    #[test]
    fn test_missing_header_requires_auth() {
        let manager = AuthManager::new("test-secret", 24);
        let err = manager.authenticate_headers(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::AuthRequired);
    }

    #[test]
    fn test_bearer_header_accepted() {
        let manager = AuthManager::new("test-secret", 24);
        let user = test_user();
        let token = manager.generate_token(&user).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {token}").parse().unwrap(),
        );

        let authed = manager.authenticate_headers(&headers).unwrap();
        assert_eq!(authed.user_id, user.id);
        assert_eq!(authed.email, user.email);
    }
}
