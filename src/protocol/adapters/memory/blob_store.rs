//! In-memory blob store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::poisoned;
use crate::protocol::ports::{BlobStore, BlobStoreError, BlobStoreResult};

/// Thread-safe in-memory blob store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStore {
    state: Arc<RwLock<BlobState>>,
}

#[derive(Debug, Default)]
struct BlobState {
    blobs: HashMap<String, StoredBlob>,
    writes_fail: bool,
}

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
}

impl InMemoryBlobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a blob directly, bypassing the write path.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Io`] if the lock is poisoned.
    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) -> BlobStoreResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| BlobStoreError::io(poisoned(&err)))?;
        state.blobs.insert(
            key.into(),
            StoredBlob {
                bytes,
                content_type: "application/octet-stream".to_owned(),
            },
        );
        Ok(())
    }

    /// Makes every subsequent [`BlobStore::write`] fail.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Io`] if the lock is poisoned.
    pub fn fail_writes(&self, fail: bool) -> BlobStoreResult<()> {
        self.state
            .write()
            .map_err(|err| BlobStoreError::io(poisoned(&err)))?
            .writes_fail = fail;
        Ok(())
    }

    /// Returns the content type recorded for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Io`] if the lock is poisoned.
    pub fn content_type(&self, key: &str) -> BlobStoreResult<Option<String>> {
        let state = self
            .state
            .read()
            .map_err(|err| BlobStoreError::io(poisoned(&err)))?;
        Ok(state.blobs.get(key).map(|blob| blob.content_type.clone()))
    }

    /// Returns every stored key in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Io`] if the lock is poisoned.
    pub fn keys(&self) -> BlobStoreResult<Vec<String>> {
        let state = self
            .state
            .read()
            .map_err(|err| BlobStoreError::io(poisoned(&err)))?;
        let mut keys: Vec<String> = state.blobs.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn read(&self, key: &str) -> BlobStoreResult<Vec<u8>> {
        let state = self
            .state
            .read()
            .map_err(|err| BlobStoreError::io(poisoned(&err)))?;
        state
            .blobs
            .get(key)
            .map(|blob| blob.bytes.clone())
            .ok_or_else(|| BlobStoreError::NotFound(key.to_owned()))
    }

    async fn write(&self, key: &str, bytes: &[u8], content_type: &str) -> BlobStoreResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| BlobStoreError::io(poisoned(&err)))?;
        if state.writes_fail {
            return Err(BlobStoreError::io(std::io::Error::other(
                "blob store is rejecting writes",
            )));
        }
        state.blobs.insert(
            key.to_owned(),
            StoredBlob {
                bytes: bytes.to_vec(),
                content_type: content_type.to_owned(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> BlobStoreResult<()> {
        self.state
            .write()
            .map_err(|err| BlobStoreError::io(poisoned(&err)))?
            .blobs
            .remove(key);
        Ok(())
    }
}
