//! In-memory entity store with live query support.

use crate::adapters::{Document, EntityStore, SnapshotCallback, Subscription};
use ::async_trait::async_trait;
use helio_core::{
    new_entity_id, Collection, EntityId, Filter, HelioResult, StorageError,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

type Table = BTreeMap<EntityId, Value>;

struct Subscriber {
    collection: Collection,
    filter: Filter,
    callback: SnapshotCallback,
}

/// In-memory entity store for tests and local runs.
///
/// Documents are kept per collection in id order; ids are UUIDv7 so that is
/// also creation order. Subscribers receive a full snapshot on subscribe and
/// after every write to their collection.
#[derive(Default)]
pub struct InMemoryEntityStore {
    tables: RwLock<HashMap<Collection, Table>>,
    subscribers: Arc<Mutex<HashMap<u64, Subscriber>>>,
    next_subscriber: AtomicU64,
}

impl InMemoryEntityStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored documents. Subscriptions stay open.
    pub fn clear(&self) -> HelioResult<()> {
        self.tables
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .clear();
        for collection in Collection::ALL {
            self.notify(collection)?;
        }
        Ok(())
    }

    /// Get count of documents in a collection.
    pub fn count(&self, collection: Collection) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(&collection).map_or(0, |t| t.len()))
            .unwrap_or(0)
    }

    /// Get count of open subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn snapshot(&self, collection: Collection, filter: &Filter) -> HelioResult<Vec<Document>> {
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(tables
            .get(&collection)
            .map(|table| {
                table
                    .iter()
                    .filter(|(_, data)| filter.matches(data))
                    .map(|(id, data)| Document::new(*id, data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Push fresh snapshots to every subscriber of `collection`.
    ///
    /// Callbacks run after all locks are released so they may call back
    /// into the store.
    fn notify(&self, collection: Collection) -> HelioResult<()> {
        let targets: Vec<(Filter, SnapshotCallback)> = {
            let subscribers = self
                .subscribers
                .lock()
                .map_err(|_| StorageError::LockPoisoned)?;
            subscribers
                .values()
                .filter(|s| s.collection == collection)
                .map(|s| (s.filter.clone(), s.callback.clone()))
                .collect()
        };

        for (filter, callback) in targets {
            let docs = self.snapshot(collection, &filter)?;
            callback(docs);
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn create(&self, collection: Collection, data: Value) -> HelioResult<EntityId> {
        if !data.is_object() {
            return Err(StorageError::InsertFailed {
                collection,
                reason: "document body must be a JSON object".to_string(),
            }
            .into());
        }

        let id = new_entity_id();
        {
            let mut tables = self.tables.write().map_err(|_| StorageError::LockPoisoned)?;
            tables.entry(collection).or_default().insert(id, data);
        }
        self.notify(collection)?;
        Ok(id)
    }

    async fn get(&self, collection: Collection, id: EntityId) -> HelioResult<Option<Document>> {
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(tables
            .get(&collection)
            .and_then(|table| table.get(&id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn update(
        &self,
        collection: Collection,
        id: EntityId,
        partial: Value,
    ) -> HelioResult<()> {
        let Value::Object(fields) = partial else {
            return Err(StorageError::UpdateFailed {
                collection,
                id,
                reason: "partial update must be a JSON object".to_string(),
            }
            .into());
        };

        {
            let mut tables = self.tables.write().map_err(|_| StorageError::LockPoisoned)?;
            let existing = tables
                .get_mut(&collection)
                .and_then(|table| table.get_mut(&id))
                .ok_or(StorageError::NotFound { collection, id })?;

            if let Value::Object(target) = existing {
                for (key, value) in fields {
                    target.insert(key, value);
                }
            }
        }
        self.notify(collection)
    }

    async fn delete(&self, collection: Collection, id: EntityId) -> HelioResult<()> {
        let removed = {
            let mut tables = self.tables.write().map_err(|_| StorageError::LockPoisoned)?;
            tables
                .get_mut(&collection)
                .and_then(|table| table.remove(&id))
                .is_some()
        };
        if removed {
            self.notify(collection)?;
        }
        Ok(())
    }

    async fn query(&self, collection: Collection, filter: &Filter) -> HelioResult<Vec<Document>> {
        self.snapshot(collection, filter)
    }

    async fn subscribe(
        &self,
        collection: Collection,
        filter: Filter,
        on_snapshot: SnapshotCallback,
    ) -> HelioResult<Subscription> {
        let key = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let initial = self.snapshot(collection, &filter)?;

        self.subscribers
            .lock()
            .map_err(|_| StorageError::SubscribeFailed {
                collection,
                reason: "subscriber registry poisoned".to_string(),
            })?
            .insert(
                key,
                Subscriber {
                    collection,
                    filter,
                    callback: on_snapshot.clone(),
                },
            );

        on_snapshot(initial);

        let registry = Arc::clone(&self.subscribers);
        Ok(Subscription::new(move || {
            if let Ok(mut subscribers) = registry.lock() {
                subscribers.remove(&key);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let store = InMemoryEntityStore::new();
        let id = store
            .create(Collection::Clients, json!({"clientName": "Ana"}))
            .await
            .unwrap();

        let doc = store.get(Collection::Clients, id).await.unwrap().unwrap();
        assert_eq!(doc.data["clientName"], json!("Ana"));

        store
            .update(Collection::Clients, id, json!({"phone": "555"}))
            .await
            .unwrap();
        let doc = store.get(Collection::Clients, id).await.unwrap().unwrap();
        assert_eq!(doc.data["clientName"], json!("Ana"));
        assert_eq!(doc.data["phone"], json!("555"));

        store.delete(Collection::Clients, id).await.unwrap();
        assert!(store.get(Collection::Clients, id).await.unwrap().is_none());
        // Deleting again is fine.
        store.delete(Collection::Clients, id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let store = InMemoryEntityStore::new();
        let err = store
            .update(Collection::Projects, new_entity_id(), json!({"a": 1}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), helio_core::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = InMemoryEntityStore::new();
        let id = store
            .create(Collection::Clients, json!({"x": 1}))
            .await
            .unwrap();
        assert!(store.get(Collection::Projects, id).await.unwrap().is_none());
        assert_eq!(store.count(Collection::Clients), 1);
        assert_eq!(store.count(Collection::Projects), 0);
    }

    #[tokio::test]
    async fn test_rejects_non_object_bodies() {
        let store = InMemoryEntityStore::new();
        assert!(store.create(Collection::Files, json!([1, 2])).await.is_err());
    }

    #[tokio::test]
    async fn test_subscribe_pushes_initial_and_filtered_snapshots() {
        let store = InMemoryEntityStore::new();
        store
            .create(Collection::Projects, json!({"userId": "u1", "n": 1}))
            .await
            .unwrap();

        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = store
            .subscribe(
                Collection::Projects,
                Filter::where_eq("userId", "u1"),
                Arc::new(move |docs: Vec<Document>| sink.lock().unwrap().push(docs.len())),
            )
            .await
            .unwrap();

        store
            .create(Collection::Projects, json!({"userId": "u2"}))
            .await
            .unwrap();
        store
            .create(Collection::Projects, json!({"userId": "u1", "n": 2}))
            .await
            .unwrap();
        store
            .create(Collection::Clients, json!({"clientName": "ignored"}))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1, 1, 2]);
        assert_eq!(store.active_subscriptions(), 1);

        sub.unsubscribe();
        assert_eq!(store.active_subscriptions(), 0);

        store
            .create(Collection::Projects, json!({"userId": "u1"}))
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn runtime() -> tokio::runtime::Runtime {
            tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap()
        }

        proptest! {
            /// **Property: update merges top-level fields**
            ///
            /// After an update, every key from the partial body holds the new
            /// value and every other key keeps its original value.
            #[test]
            fn prop_update_merges_fields(
                original in prop::collection::btree_map("[a-e]", 0i64..100, 1..5),
                partial in prop::collection::btree_map("[c-h]", 100i64..200, 1..5),
            ) {
                let store = InMemoryEntityStore::new();
                let doc = runtime().block_on(async {
                    let id = store
                        .create(Collection::Clients, serde_json::to_value(&original).unwrap())
                        .await
                        .unwrap();
                    store
                        .update(Collection::Clients, id, serde_json::to_value(&partial).unwrap())
                        .await
                        .unwrap();
                    store.get(Collection::Clients, id).await.unwrap().unwrap()
                });

                for (key, value) in &partial {
                    prop_assert_eq!(&doc.data[key.as_str()], &json!(value));
                }
                for (key, value) in original.iter().filter(|(k, _)| !partial.contains_key(*k)) {
                    prop_assert_eq!(&doc.data[key.as_str()], &json!(value));
                }
            }

            /// **Property: equality queries return exactly the matching documents**
            #[test]
            fn prop_eq_query_matches_exactly(owners in prop::collection::vec(0u8..4, 0..12)) {
                let store = InMemoryEntityStore::new();
                let hits = runtime().block_on(async {
                    for owner in &owners {
                        store
                            .create(Collection::Projects, json!({"userId": format!("u{}", owner)}))
                            .await
                            .unwrap();
                    }
                    store
                        .query(Collection::Projects, &Filter::where_eq("userId", "u0"))
                        .await
                        .unwrap()
                });

                let expected = owners.iter().filter(|o| **o == 0).count();
                prop_assert_eq!(hits.len(), expected);
            }
        }
    }
}
