//! Read-through cache with observable, per-key loading state.
//!
//! Lookups are answered from memory when possible. A miss marks the key as
//! loading, fetches through a [`StorageFetcher`], and inserts the result on
//! success. A second load for a key that is already in flight waits for the
//! first one instead of fetching again.
//!
//! Fetch failures never propagate. They are recorded per key as a message
//! in [`CacheState::errors`] and the load returns `None`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use helio_core::ClientRecord;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::traits::{CacheStats, CacheableEntity, StorageFetcher};

/// Observable state of a [`ReadThroughCache`].
#[derive(Debug, Clone)]
pub struct CacheState<T: CacheableEntity> {
    /// Cached records by id.
    pub entries: HashMap<T::Id, T>,
    /// Ids with a fetch in flight.
    pub loading: HashSet<T::Id>,
    /// Last failure message per id, cleared when a new load starts.
    pub errors: HashMap<T::Id, String>,
}

impl<T: CacheableEntity> Default for CacheState<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            loading: HashSet::new(),
            errors: HashMap::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

enum Claim<T> {
    Cached(T),
    InFlight,
    Claimed,
}

/// Clears the loading mark for a key when dropped, so an abandoned load
/// never leaves waiters hanging.
struct LoadingMark<'a, T: CacheableEntity> {
    state: &'a watch::Sender<CacheState<T>>,
    id: T::Id,
}

impl<T: CacheableEntity> Drop for LoadingMark<'_, T> {
    fn drop(&mut self) {
        let id = self.id;
        self.state.send_if_modified(|s| s.loading.remove(&id));
    }
}

/// Read-through cache keyed by entity id.
pub struct ReadThroughCache<T, S>
where
    T: CacheableEntity,
    S: StorageFetcher<T> + ?Sized,
{
    fetcher: Arc<S>,
    state: watch::Sender<CacheState<T>>,
    counters: Counters,
}

/// Cache of client records loaded by id.
pub type ClientCache<S> = ReadThroughCache<ClientRecord, S>;

impl<T, S> ReadThroughCache<T, S>
where
    T: CacheableEntity,
    S: StorageFetcher<T> + ?Sized,
{
    /// Create an empty cache over a fetcher.
    pub fn new(fetcher: Arc<S>) -> Self {
        let (state, _) = watch::channel(CacheState::default());
        Self {
            fetcher,
            state,
            counters: Counters::default(),
        }
    }

    /// Look up a cached record. No I/O.
    pub fn get_cached(&self, id: T::Id) -> Option<T> {
        self.state.borrow().entries.get(&id).cloned()
    }

    /// Return the cached record, or fetch and cache it.
    ///
    /// Returns `None` if the record does not exist or the fetch failed; in
    /// the latter case the failure is available through [`Self::error_for`].
    pub async fn load_by_id(&self, id: T::Id) -> Option<T> {
        let mut claim = Claim::InFlight;
        self.state.send_if_modified(|s| {
            if let Some(hit) = s.entries.get(&id) {
                claim = Claim::Cached(hit.clone());
                return false;
            }
            if s.loading.contains(&id) {
                return false;
            }
            s.loading.insert(id);
            s.errors.remove(&id);
            claim = Claim::Claimed;
            true
        });

        match claim {
            Claim::Cached(record) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(collection = %T::COLLECTION, id = %id, "Cache hit");
                Some(record)
            }
            Claim::InFlight => self.wait_for_inflight(id).await,
            Claim::Claimed => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                self.fetch_and_cache(id).await
            }
        }
    }

    /// Cache-first lookup. Never fetches an id that is already cached.
    pub async fn get_or_load(&self, id: T::Id) -> Option<T> {
        if let Some(record) = self.get_cached(id) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Some(record);
        }
        self.load_by_id(id).await
    }

    /// Insert a record known to be current, e.g. one just created.
    pub fn insert(&self, id: T::Id, record: T) {
        self.state.send_modify(|s| {
            s.entries.insert(id, record);
            s.errors.remove(&id);
        });
    }

    /// Drop a single entry.
    pub fn evict(&self, id: T::Id) -> Option<T> {
        let mut evicted = None;
        self.state.send_if_modified(|s| {
            evicted = s.entries.remove(&id);
            evicted.is_some()
        });
        evicted
    }

    /// Empty the cache and its error messages. In-flight loads are not
    /// cancelled and will insert their result when they finish.
    pub fn clear(&self) {
        self.state.send_modify(|s| {
            s.entries.clear();
            s.errors.clear();
        });
    }

    /// Immutable copy of the cached map.
    pub fn snapshot(&self) -> HashMap<T::Id, T> {
        self.state.borrow().entries.clone()
    }

    pub fn is_loading(&self, id: T::Id) -> bool {
        self.state.borrow().loading.contains(&id)
    }

    /// Message from the most recent failed load of `id`.
    pub fn error_for(&self, id: T::Id) -> Option<String> {
        self.state.borrow().errors.get(&id).cloned()
    }

    /// Subscribe to state changes.
    pub fn watch(&self) -> watch::Receiver<CacheState<T>> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            entry_count: self.state.borrow().entries.len() as u64,
        }
    }

    async fn wait_for_inflight(&self, id: T::Id) -> Option<T> {
        debug!(collection = %T::COLLECTION, id = %id, "Waiting for in-flight load");
        let mut rx = self.state.subscribe();
        let state = rx.wait_for(|s| !s.loading.contains(&id)).await.ok()?;
        state.entries.get(&id).cloned()
    }

    async fn fetch_and_cache(&self, id: T::Id) -> Option<T> {
        let _mark = LoadingMark {
            state: &self.state,
            id,
        };

        match self.fetcher.fetch(id).await {
            Ok(Some(record)) => {
                self.state.send_modify(|s| {
                    s.entries.insert(id, record.clone());
                    s.loading.remove(&id);
                });
                debug!(collection = %T::COLLECTION, id = %id, "Loaded into cache");
                Some(record)
            }
            Ok(None) => {
                debug!(collection = %T::COLLECTION, id = %id, "Record not found");
                None
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(collection = %T::COLLECTION, id = %id, error = %e, "Cache load failed");
                self.state.send_modify(|s| {
                    s.errors.insert(id, e.to_string());
                    s.loading.remove(&id);
                });
                None
            }
        }
    }
}
