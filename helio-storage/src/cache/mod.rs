//! Read-through record cache.
//!
//! The cache keeps records loaded by id and publishes its state on a
//! `tokio::sync::watch` channel so observers can render loading flags and
//! per-key error messages.
//!
//! # Example
//!
//! ```ignore
//! let cache = ClientCache::new(store.clone());
//!
//! // Fetches once, then answers from memory.
//! let client = cache.get_or_load(client_id).await;
//! assert!(cache.get_cached(client_id).is_some());
//! ```

pub mod read_through;
pub mod traits;

pub use read_through::{CacheState, ClientCache, ReadThroughCache};
pub use traits::{CacheStats, CacheableEntity, StorageFetcher};
