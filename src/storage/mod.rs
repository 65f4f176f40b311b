// ABOUTME: Object storage abstraction for uploaded invoice documents
// ABOUTME: Defines the store/retrieve/remove seam implemented by the local backend

//! # Object Storage
//!
//! Uploaded invoice files live in an object store keyed by
//! `<owner_uuid>/<uuid>.<ext>`. The trait is the seam for tests; the
//! shipped backend is [`local::LocalObjectStore`], which keeps files on
//! the local filesystem and authenticates downloads with HMAC-signed
//! URLs instead of bearer tokens.

pub mod local;

pub use local::LocalObjectStore;

use crate::errors::AppResult;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// A stored file: its storage key and a retrievable URL
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

/// Storage backend for uploaded documents
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist a file and return its key and a signed URL
    async fn store(
        &self,
        bytes: &[u8],
        original_name: &str,
        mime: &str,
        owner: Uuid,
    ) -> AppResult<StoredObject>;

    /// Produce a signed download URL valid for `ttl`
    fn signed_url(&self, key: &str, ttl: Duration) -> String;

    /// Remove a stored file; false when it was already gone
    async fn remove(&self, key: &str) -> AppResult<bool>;

    /// Whether a key currently exists
    async fn exists(&self, key: &str) -> bool;
}
