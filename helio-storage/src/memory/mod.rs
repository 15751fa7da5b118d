//! In-memory adapter implementations.
//!
//! Used by tests and by the `helio-submit` tool. They honor the same
//! contracts as a hosted backend: server-assigned ids, merge updates,
//! idempotent deletes, and snapshot pushes to subscribers.

mod blob_store;
mod entity_store;
mod identity;

pub use blob_store::{InMemoryBlobStore, StoredBlob, DEFAULT_BLOB_BASE_URL};
pub use entity_store::InMemoryEntityStore;
pub use identity::SessionIdentity;
