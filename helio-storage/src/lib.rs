//! HELIO Storage - Adapter Traits, Cache, and In-Memory Implementations
//!
//! Defines the seams the intake core writes through: an entity store for
//! documents, a blob store for binary objects, and an identity provider.
//! Hosted backends implement these traits outside this workspace; the
//! in-memory versions here back tests and the `helio-submit` tool.

pub mod adapters;
pub mod cache;
pub mod collections;
pub mod memory;

pub use adapters::{
    BlobStore, Document, EntityStore, IdentityProvider, SnapshotCallback, Subscription,
};
pub use cache::{
    CacheState, CacheStats, CacheableEntity, ClientCache, ReadThroughCache, StorageFetcher,
};
pub use collections::{decode_projects, EntityStoreExt};
pub use memory::{InMemoryBlobStore, InMemoryEntityStore, SessionIdentity, StoredBlob};
