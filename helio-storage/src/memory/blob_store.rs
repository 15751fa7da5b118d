//! In-memory blob store.

use crate::adapters::BlobStore;
use ::async_trait::async_trait;
use helio_core::{BlobError, HelioResult};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Default base for generated download URLs.
pub const DEFAULT_BLOB_BASE_URL: &str = "memory://blobs";

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Blob store that keeps objects in memory.
///
/// Download URLs are `{base_url}/{percent-encoded path}` and only resolve
/// while the object exists.
pub struct InMemoryBlobStore {
    base_url: String,
    objects: RwLock<BTreeMap<String, StoredBlob>>,
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new(DEFAULT_BLOB_BASE_URL)
    }
}

impl InMemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Get a copy of a stored object.
    pub fn object(&self, path: &str) -> Option<StoredBlob> {
        self.objects.read().ok()?.get(path).cloned()
    }

    /// All stored paths in lexical order.
    pub fn paths(&self) -> Vec<String> {
        self.objects
            .read()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(path))
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> HelioResult<()> {
        let mut objects = self.objects.write().map_err(|_| BlobError::UploadFailed {
            path: path.to_string(),
            reason: "object table lock poisoned".to_string(),
        })?;
        objects.insert(
            path.to_string(),
            StoredBlob {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn download_url(&self, path: &str) -> HelioResult<String> {
        let objects = self.objects.read().map_err(|_| BlobError::LocatorFailed {
            path: path.to_string(),
            reason: "object table lock poisoned".to_string(),
        })?;
        if !objects.contains_key(path) {
            return Err(BlobError::NotFound {
                path: path.to_string(),
            }
            .into());
        }
        Ok(self.url_for(path))
    }

    async fn delete(&self, path: &str) -> HelioResult<()> {
        self.objects
            .write()
            .map_err(|_| BlobError::DeleteFailed {
                path: path.to_string(),
                reason: "object table lock poisoned".to_string(),
            })?
            .remove(path);
        Ok(())
    }
}
