// ABOUTME: Library root for the Invoice Insights API
// ABOUTME: Declares the module tree shared by the server binary and tests

//! # Invoice Insights API
//!
//! AI-powered invoice ingestion backend. Users upload invoice documents,
//! a vision model extracts structured line-item data, and the backend
//! stores it for analytics and a conversational assistant.
//!
//! The core is the ingestion pipeline ([`ingest`]): upload → object
//! storage ([`storage`]) → AI extraction ([`llm`]) → categorization →
//! transactional persistence ([`database`]). The HTTP surface lives in
//! [`routes`] and is assembled by [`server`].

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

/// JWT authentication
pub mod auth;
/// Environment configuration
pub mod config;
/// SQLite persistence
pub mod database;
/// Unified error handling
pub mod errors;
/// The ingestion pipeline
pub mod ingest;
/// AI provider integration
pub mod llm;
/// Structured logging setup
pub mod logging;
/// Domain models
pub mod models;
/// HTTP route handlers
pub mod routes;
/// Server assembly
pub mod server;
/// Object storage
pub mod storage;
