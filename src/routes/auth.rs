// ABOUTME: Authentication route handlers for registration, login, and demo access
// ABOUTME: Validates credentials, hashes passwords, and issues JWT tokens

use crate::errors::{AppError, AppResult};
use crate::models::User;
use crate::server::ServerResources;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Registration request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user account
#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
        }
    }
}

/// Response carrying a fresh token
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserInfo,
    pub token: String,
}

// ============================================================================
// Auth Service
// ============================================================================

/// Registration and login business logic, shared by routes and tests
pub struct AuthService {
    resources: Arc<ServerResources>,
}

impl AuthService {
    #[must_use]
    pub fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Register a new user account
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for malformed credentials and
    /// `ResourceAlreadyExists` for a taken email.
    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::invalid_input("Invalid email format"));
        }
        if request.password.len() < 8 {
            return Err(AppError::invalid_input(
                "Password must be at least 8 characters",
            ));
        }

        let password_hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::internal("failed to hash password").with_source(e))?;

        let user = User::new(email, password_hash, request.full_name);
        self.resources.database.create_user(&user).await?;
        let token = self.resources.auth_manager.generate_token(&user)?;

        info!(user_id = %user.id, email = %user.email, "user registered");

        Ok(AuthResponse {
            message: "User created successfully".into(),
            user: UserInfo::from(&user),
            token,
        })
    }

    /// Authenticate an existing user
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` for an unknown email or wrong password,
    /// without distinguishing the two.
    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();
        let user = self
            .resources
            .database
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::auth_invalid("Invalid credentials"))?;

        let hash = user.password_hash.clone();
        let password = request.password;
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash))
            .await
            .map_err(|e| AppError::internal("password verification task failed").with_source(e))?
            .map_err(|e| AppError::internal("password verification failed").with_source(e))?;

        if !valid {
            return Err(AppError::auth_invalid("Invalid credentials"));
        }

        let token = self.resources.auth_manager.generate_token(&user)?;
        info!(user_id = %user.id, "user logged in");

        Ok(AuthResponse {
            message: "Login successful".into(),
            user: UserInfo::from(&user),
            token,
        })
    }

    /// Create a throwaway demo account and log it in
    ///
    /// # Errors
    ///
    /// Returns database or token errors.
    pub async fn demo_login(&self) -> AppResult<AuthResponse> {
        let email = format!(
            "demo_{}@invoiceinsights.demo",
            chrono::Utc::now().timestamp_millis()
        );
        let password_hash = bcrypt::hash(uuid::Uuid::new_v4().to_string(), bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::internal("failed to hash password").with_source(e))?;

        let user = User::new(email, password_hash, Some("Demo User".into()));
        self.resources.database.create_user(&user).await?;
        let token = self.resources.auth_manager.generate_token(&user)?;

        info!(user_id = %user.id, "demo user created");

        Ok(AuthResponse {
            message: "Demo login successful".into(),
            user: UserInfo::from(&user),
            token,
        })
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Authentication routes handler
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all authentication routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/auth/register", post(Self::register))
            .route("/api/auth/login", post(Self::login))
            .route("/api/auth/demo-login", post(Self::demo_login))
            .with_state(resources)
    }

    async fn register(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<RegisterRequest>,
    ) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
        let response = AuthService::new(resources).register(request).await?;
        Ok((StatusCode::CREATED, Json(response)))
    }

    async fn login(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<LoginRequest>,
    ) -> Result<Json<AuthResponse>, AppError> {
        let response = AuthService::new(resources).login(request).await?;
        Ok(Json(response))
    }

    async fn demo_login(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Json<AuthResponse>, AppError> {
        let response = AuthService::new(resources).demo_login().await?;
        Ok(Json(response))
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
