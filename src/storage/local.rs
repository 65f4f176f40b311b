// ABOUTME: Filesystem-backed object store with HMAC-signed download URLs
// ABOUTME: Handles key generation, signature verification, and expiry checks

use super::{ObjectStore, StoredObject};
use crate::config::StorageConfig;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use ring::hmac;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Local filesystem object store.
///
/// Keys have the form `<owner_uuid>/<uuid>.<ext>` so concurrent uploads
/// can never collide. Download URLs carry an expiry timestamp and an
/// HMAC-SHA256 signature over `key\nexpires`; the files route verifies
/// both before serving a byte.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
    signing_key: hmac::Key,
    default_ttl: Duration,
}

impl LocalObjectStore {
    /// Create a store rooted at the configured directory
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.root.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_owned(),
            signing_key: hmac::Key::new(
                hmac::HMAC_SHA256,
                config.url_signing_secret.as_bytes(),
            ),
            default_ttl: Duration::from_secs(config.signed_url_ttl_secs),
        }
    }

    /// The default TTL applied to URLs returned from [`ObjectStore::store`]
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Verify a signed download request for `key`
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` for a bad signature or malformed key and
    /// `AuthExpired` for an expired URL.
    pub fn verify(&self, key: &str, expires: u64, signature_hex: &str) -> AppResult<()> {
        validate_key(key)?;

        let payload = signing_payload(key, expires);
        let signature = hex::decode(signature_hex)
            .map_err(|_| AppError::auth_invalid("Malformed URL signature"))?;
        hmac::verify(&self.signing_key, payload.as_bytes(), &signature)
            .map_err(|_| AppError::auth_invalid("Invalid URL signature"))?;

        if expires < unix_now() {
            return Err(AppError::auth_expired());
        }

        Ok(())
    }

    /// Read a stored file's contents
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the key does not exist and
    /// `StorageUnavailable` on any other I/O failure.
    pub async fn load(&self, key: &str) -> AppResult<Vec<u8>> {
        validate_key(key)?;
        let path = self.root.join(key);

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::not_found("File"))
            }
            Err(e) => Err(AppError::storage(format!("failed to read {key}")).with_source(e)),
        }
    }

    fn sign(&self, key: &str, expires: u64) -> String {
        let tag = hmac::sign(&self.signing_key, signing_payload(key, expires).as_bytes());
        hex::encode(tag.as_ref())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn store(
        &self,
        bytes: &[u8],
        original_name: &str,
        mime: &str,
        owner: Uuid,
    ) -> AppResult<StoredObject> {
        let ext = extension_for(original_name, mime);
        let key = format!("{owner}/{}.{ext}", Uuid::new_v4());
        let path = self.root.join(&key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::storage("failed to create storage directory").with_source(e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::storage(format!("failed to write {key}")).with_source(e))?;

        let url = self.signed_url(&key, self.default_ttl);
        Ok(StoredObject { key, url })
    }

    fn signed_url(&self, key: &str, ttl: Duration) -> String {
        let expires = unix_now() + ttl.as_secs();
        let signature = self.sign(key, expires);
        format!(
            "{}/api/files/{key}?expires={expires}&sig={signature}",
            self.public_base_url
        )
    }

    async fn remove(&self, key: &str) -> AppResult<bool> {
        validate_key(key)?;
        let path = self.root.join(key);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::storage(format!("failed to remove {key}")).with_source(e)),
        }
    }

    async fn exists(&self, key: &str) -> bool {
        if validate_key(key).is_err() {
            return false;
        }
        tokio::fs::try_exists(self.root.join(key))
            .await
            .unwrap_or(false)
    }
}

fn signing_payload(key: &str, expires: u64) -> String {
    format!("{key}\n{expires}")
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Reject keys that could escape the storage root
fn validate_key(key: &str) -> AppResult<()> {
    let path = Path::new(key);
    let safe = !key.is_empty()
        && !path.is_absolute()
        && path
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)));
    if safe {
        Ok(())
    } else {
        Err(AppError::auth_invalid("Malformed storage key"))
    }
}

fn extension_for(original_name: &str, mime: &str) -> String {
    let from_name = original_name
        .rsplit('.')
        .next()
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && *ext != original_name
        })
        .map(str::to_lowercase);

    from_name.unwrap_or_else(|| {
        match mime {
            "application/pdf" => "pdf",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "jpg",
        }
        .to_owned()
    })
}
