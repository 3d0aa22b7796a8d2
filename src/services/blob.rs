// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Blob storage for uploaded proof-of-completion files.
//!
//! Files are written under the configured uploads directory and served
//! back read-only by the router at [`UPLOADS_URL_PREFIX`].

use crate::config::UPLOADS_URL_PREFIX;
use async_trait::async_trait;
use std::path::PathBuf;

/// Blob storage errors
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("empty upload")]
    Empty,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Backend(String),
}

/// A stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Name the blob was stored under
    pub key: String,
    /// Path clients can fetch the blob from
    pub url: String,
}

/// Opaque store that persists a file and returns a retrievable URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, original_name: &str, bytes: &[u8]) -> Result<StoredBlob, BlobError>;
}

/// Blob store backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, original_name: &str, bytes: &[u8]) -> Result<StoredBlob, BlobError> {
        if bytes.is_empty() {
            return Err(BlobError::Empty);
        }

        tokio::fs::create_dir_all(&self.root).await?;

        let key = unique_blob_name(original_name);
        tokio::fs::write(self.root.join(&key), bytes).await?;

        tracing::debug!(key = %key, size = bytes.len(), "Stored upload");

        Ok(StoredBlob {
            url: format!("{}/{}", UPLOADS_URL_PREFIX, key),
            key,
        })
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_`.
///
/// Path separators are replaced too, so the result is always a single path
/// component.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "upload".to_string(),
        _ => cleaned,
    }
}

/// `<unix millis>-<8 hex chars>-<sanitized name>`
fn unique_blob_name(original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", millis, &nonce[..8], sanitize_filename(original_name))
}
