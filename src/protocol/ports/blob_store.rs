//! Byte storage port for photos, blueprints and generated protocols.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for blob store operations.
pub type BlobStoreResult<T> = Result<T, BlobStoreError>;

/// Content type of generated protocols.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Key-addressed byte storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reads the bytes stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::NotFound`] when nothing is stored under the
    /// key.
    async fn read(&self, key: &str) -> BlobStoreResult<Vec<u8>>;

    /// Stores `bytes` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::InvalidKey`] when the key cannot be stored
    /// and [`BlobStoreError::Io`] when the write fails.
    async fn write(&self, key: &str, bytes: &[u8], content_type: &str) -> BlobStoreResult<()>;

    /// Removes the blob stored under `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::InvalidKey`] when the key cannot be stored
    /// and [`BlobStoreError::Io`] when the removal fails.
    async fn delete(&self, key: &str) -> BlobStoreResult<()>;
}

/// Errors returned by blob store implementations.
#[derive(Debug, Clone, Error)]
pub enum BlobStoreError {
    /// No blob is stored under the key.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The key is not acceptable to the store.
    #[error("invalid blob key '{key}': {reason}")]
    InvalidKey {
        /// Rejected key.
        key: String,
        /// Why the key was rejected.
        reason: &'static str,
    },

    /// Storage-layer failure.
    #[error("blob store i/o error: {0}")]
    Io(Arc<dyn std::error::Error + Send + Sync>),
}

impl BlobStoreError {
    /// Wraps a storage-layer error.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Arc::new(err))
    }
}
