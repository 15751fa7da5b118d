//! Cacheable entity marker and fetcher seam.

use crate::adapters::EntityStore;
use crate::collections::EntityStoreExt;
use ::async_trait::async_trait;
use helio_core::{ClientId, ClientRecord, Collection, HelioResult};
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Marker trait for records that can be cached by id.
///
/// The id is not part of the record body, so the cache is keyed externally
/// by `Id` rather than asking the entity for its own identity.
pub trait CacheableEntity: Clone + Debug + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Collection the entity is stored in.
    const COLLECTION: Collection;
}

impl CacheableEntity for ClientRecord {
    type Id = ClientId;
    const COLLECTION: Collection = Collection::Clients;
}

/// Fetches an entity from the underlying store on a cache miss.
#[async_trait]
pub trait StorageFetcher<T: CacheableEntity>: Send + Sync {
    /// Fetch an entity by id. `Ok(None)` means it does not exist.
    async fn fetch(&self, id: T::Id) -> HelioResult<Option<T>>;
}

#[async_trait]
impl<S: EntityStore + ?Sized> StorageFetcher<ClientRecord> for S {
    async fn fetch(&self, id: ClientId) -> HelioResult<Option<ClientRecord>> {
        self.client_get(id).await
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Lookups answered from the cache without I/O.
    pub hits: u64,
    /// Lookups that had to go to the store.
    pub misses: u64,
    /// Fetches that failed with an adapter error.
    pub failures: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
