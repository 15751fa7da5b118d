//! Adapter traits for the stores the intake core writes to.
//!
//! The core never talks to a concrete database or object store. It is
//! handed an [`EntityStore`], a [`BlobStore`], and an [`IdentityProvider`]
//! and only ever suspends inside calls across these traits.

use ::async_trait::async_trait;
use chrono::Utc;
use helio_core::{Collection, EntityId, Filter, HelioResult, StorageError, Timestamp, UserId};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A stored document: its id plus the JSON body.
///
/// The id is not part of the body; [`Document::decode`] splices it in so
/// records that carry an `id` field deserialize directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: EntityId,
    pub data: Value,
}

impl Document {
    pub fn new(id: EntityId, data: Value) -> Self {
        Self { id, data }
    }

    /// Deserialize the body into a typed record.
    pub fn decode<T: DeserializeOwned>(&self, collection: Collection) -> HelioResult<T> {
        let mut data = self.data.clone();
        if let Value::Object(map) = &mut data {
            map.entry("id")
                .or_insert_with(|| Value::String(self.id.to_string()));
        }
        serde_json::from_value(data).map_err(|e| {
            StorageError::Serialization {
                collection,
                reason: format!("document {}: {}", self.id, e),
            }
            .into()
        })
    }
}

/// Callback invoked with the full matching result set on every change.
pub type SnapshotCallback = Arc<dyn Fn(Vec<Document>) + Send + Sync>;

/// Handle to an open subscription.
///
/// Releasing the handle (explicitly or by dropping it) closes the push
/// channel. Releasing twice is a no-op.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Close the subscription now.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Document database access.
///
/// Writes are atomic per document. There are no cross-document
/// transactions.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Create a document and return the id the store assigned to it.
    async fn create(&self, collection: Collection, data: Value) -> HelioResult<EntityId>;

    /// Fetch a document by id.
    async fn get(&self, collection: Collection, id: EntityId) -> HelioResult<Option<Document>>;

    /// Merge top-level fields of `partial` into an existing document.
    async fn update(&self, collection: Collection, id: EntityId, partial: Value)
        -> HelioResult<()>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: Collection, id: EntityId) -> HelioResult<()>;

    /// List documents matching a filter.
    async fn query(&self, collection: Collection, filter: &Filter) -> HelioResult<Vec<Document>>;

    /// Open a continuous query. `on_snapshot` receives the full matching set
    /// once on subscribe and again after every change to the collection.
    async fn subscribe(
        &self,
        collection: Collection,
        filter: Filter,
        on_snapshot: SnapshotCallback,
    ) -> HelioResult<Subscription>;

    /// Timestamp the store stamps on `createdAt`/`updatedAt`/`uploadedAt`.
    fn server_timestamp(&self) -> Timestamp {
        Utc::now()
    }
}

/// Binary object storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store an object at `path`, replacing any existing object.
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> HelioResult<()>;

    /// Resolve a URL the object can be downloaded from.
    async fn download_url(&self, path: &str) -> HelioResult<String>;

    /// Remove an object.
    async fn delete(&self, path: &str) -> HelioResult<()>;
}

/// Source of the currently authenticated identity.
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<UserId>;
}
