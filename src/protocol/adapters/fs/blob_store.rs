//! Blob store backed by a capability-scoped directory.
//!
//! Keys are relative UTF-8 paths resolved inside the root directory. The
//! directory handle cannot reach outside its root, and keys that try to
//! (absolute paths or `..` components) are rejected before any I/O.

use async_trait::async_trait;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io::ErrorKind;
use std::sync::Arc;

use crate::protocol::ports::{BlobStore, BlobStoreError, BlobStoreResult};

/// Blob store rooted in a directory on disk.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: Arc<Dir>,
}

impl FsBlobStore {
    /// Opens the directory at `path` as the store root.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Io`] when the directory cannot be opened.
    pub fn open(path: &Utf8Path) -> BlobStoreResult<Self> {
        let root = Dir::open_ambient_dir(path, ambient_authority()).map_err(BlobStoreError::io)?;
        Ok(Self::from_dir(root))
    }

    /// Wraps an already opened directory.
    #[must_use]
    pub fn from_dir(root: Dir) -> Self {
        Self {
            root: Arc::new(root),
        }
    }
}

fn validate_key(key: &str) -> BlobStoreResult<Utf8PathBuf> {
    let invalid = |reason| BlobStoreError::InvalidKey {
        key: key.to_owned(),
        reason,
    };
    let path = Utf8Path::new(key);
    if key.trim().is_empty() {
        return Err(invalid("key is empty"));
    }
    if path.is_absolute() {
        return Err(invalid("key must be relative"));
    }
    let mut normal = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::Normal(part) => normal.push(part),
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => return Err(invalid("key must not contain '..'")),
            Utf8Component::RootDir | Utf8Component::Prefix(_) => {
                return Err(invalid("key must be relative"));
            }
        }
    }
    if normal.file_name().is_none() {
        return Err(invalid("key does not name a file"));
    }
    Ok(normal)
}

async fn blocking<T, F>(work: F) -> BlobStoreResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> BlobStoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| BlobStoreError::io(std::io::Error::other(err)))?
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read(&self, key: &str) -> BlobStoreResult<Vec<u8>> {
        let path = validate_key(key)?;
        let root = Arc::clone(&self.root);
        let owned_key = key.to_owned();
        blocking(move || {
            root.read(&path).map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    BlobStoreError::NotFound(owned_key)
                } else {
                    BlobStoreError::io(err)
                }
            })
        })
        .await
    }

    async fn write(&self, key: &str, bytes: &[u8], _content_type: &str) -> BlobStoreResult<()> {
        let path = validate_key(key)?;
        let root = Arc::clone(&self.root);
        let contents = bytes.to_vec();
        blocking(move || {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
                root.create_dir_all(parent).map_err(BlobStoreError::io)?;
            }
            root.write(&path, contents).map_err(BlobStoreError::io)
        })
        .await
    }

    async fn delete(&self, key: &str) -> BlobStoreResult<()> {
        let path = validate_key(key)?;
        let root = Arc::clone(&self.root);
        blocking(move || match root.remove_file(&path) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(BlobStoreError::io(err)),
            _ => Ok(()),
        })
        .await
    }
}
