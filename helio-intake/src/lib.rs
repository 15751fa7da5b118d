//! HELIO Intake - Project Submission Workflow
//!
//! Orchestrates a project intake: create the client, create the project,
//! then upload each attached file and record its metadata. Alongside the
//! orchestrator live a read-through client cache, a live subscription to
//! the signed-in user's projects, and the form draft, all gathered behind
//! [`ProjectStore`].
//!
//! State is published on `tokio::sync::watch` channels so a UI can observe
//! loading flags and error messages without polling.

pub mod form;
pub mod saga;
pub mod sanitize;
pub mod store;
pub mod submission;
pub mod subscription;

pub use form::FormDraft;
pub use saga::{CompensationLog, CompensationReport, CompletedStep};
pub use sanitize::{sanitize_file_name, storage_path};
pub use store::ProjectStore;
pub use submission::{SubmissionOrchestrator, SubmissionState};
pub use subscription::{LiveProjects, ProjectListState};

use helio_storage::{BlobStore, ClientCache, EntityStore, IdentityProvider};
use std::sync::Arc;

/// Client cache over a type-erased entity store.
pub type SharedClientCache = ClientCache<dyn EntityStore>;

/// The three external seams the intake workflow runs against.
#[derive(Clone)]
pub struct Adapters {
    pub entities: Arc<dyn EntityStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl Adapters {
    pub fn new(
        entities: Arc<dyn EntityStore>,
        blobs: Arc<dyn BlobStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            entities,
            blobs,
            identity,
        }
    }
}

impl std::fmt::Debug for Adapters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapters").finish_non_exhaustive()
    }
}
