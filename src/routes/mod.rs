// ABOUTME: HTTP route module organization for the Invoice Insights API
// ABOUTME: Re-exports the per-surface route builders consumed by the server

//! # API Routes
//!
//! One module per API surface. Each exposes a `Routes` struct whose
//! `routes()` builds an axum `Router` over [`ServerResources`]
//! (crate::server::ServerResources); protected handlers authenticate the
//! bearer header themselves.

pub mod analytics;
pub mod auth;
pub mod chat;
pub mod files;
pub mod health;
pub mod invoices;

pub use analytics::AnalyticsRoutes;
pub use auth::{AuthRoutes, AuthService};
pub use chat::ChatRoutes;
pub use files::FileRoutes;
pub use health::HealthRoutes;
pub use invoices::InvoiceRoutes;
