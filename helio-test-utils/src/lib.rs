//! HELIO Test Utilities
//!
//! Centralized test infrastructure for the HELIO workspace:
//! - Recording adapters that log call order and inject failures
//! - Proptest generators for record types
//! - Test fixtures for common scenarios
//! - Custom assertions for HELIO-specific validation

// Re-export in-memory adapters from their source crate
pub use helio_storage::{
    BlobStore, Document, EntityStore, EntityStoreExt, IdentityProvider, InMemoryBlobStore,
    InMemoryEntityStore, SessionIdentity, SnapshotCallback, Subscription,
};

// Re-export core types for convenience
pub use helio_core::{
    BlobError, ClientId, ClientRecord, Collection, EntityId, EntityIdType, ErrorKind, FileId,
    FileMetadataRecord, FileType, FileUpload, Filter, HelioError, HelioResult, IntakeConfig,
    NewProject, ProjectFileSlots, ProjectId, ProjectRecord, ProjectStatus, StorageError,
    StoredFile, SubmissionError, SubmitStep, SystemSpec, Timestamp, UserId,
    INITIAL_FILE_VERSION,
};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

// ============================================================================
// RECORDING ADAPTERS
// ============================================================================

/// One call made through a recording adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterCall {
    Create(Collection),
    Get(Collection),
    Update(Collection),
    Delete(Collection),
    Query(Collection),
    Subscribe(Collection),
    Put(String),
    DownloadUrl(String),
    BlobDelete(String),
}

impl AdapterCall {
    /// Blob path for blob calls.
    pub fn path(&self) -> Option<&str> {
        match self {
            AdapterCall::Put(p) | AdapterCall::DownloadUrl(p) | AdapterCall::BlobDelete(p) => {
                Some(p)
            }
            _ => None,
        }
    }

    /// True for a blob call whose path was stored under `slot`.
    pub fn is_for_slot(&self, slot: FileType) -> bool {
        let marker = format!("/{}_", slot.as_str());
        self.path().is_some_and(|p| p.contains(&marker))
    }
}

/// Shared, ordered log of adapter calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<AdapterCall>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: AdapterCall) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(call);
        }
    }

    /// Copy of every call so far, in order.
    pub fn calls(&self) -> Vec<AdapterCall> {
        self.0.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls equal to `call`.
    pub fn count(&self, call: &AdapterCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.0.lock() {
            calls.clear();
        }
    }
}

type FaultPredicate = Box<dyn Fn(&AdapterCall) -> bool + Send + Sync>;

#[derive(Default)]
struct Faults(Mutex<Option<FaultPredicate>>);

impl Faults {
    fn set(&self, predicate: FaultPredicate) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(predicate);
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = None;
        }
    }

    fn hits(&self, call: &AdapterCall) -> bool {
        self.0
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|p| p(call)))
            .unwrap_or(false)
    }
}

const INJECTED: &str = "injected failure";

/// Entity store wrapper that records calls and fails on demand.
pub struct RecordingEntityStore<S: EntityStore = InMemoryEntityStore> {
    inner: Arc<S>,
    log: CallLog,
    faults: Faults,
}

impl<S: EntityStore> RecordingEntityStore<S> {
    pub fn new(inner: Arc<S>, log: CallLog) -> Self {
        Self {
            inner,
            log,
            faults: Faults::default(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fail every call matching `predicate`. The call is still recorded.
    pub fn fail_when(&self, predicate: impl Fn(&AdapterCall) -> bool + Send + Sync + 'static) {
        self.faults.set(Box::new(predicate));
    }

    pub fn heal(&self) {
        self.faults.clear();
    }

    fn enter(&self, call: AdapterCall) -> bool {
        let fail = self.faults.hits(&call);
        self.log.push(call);
        fail
    }
}

#[async_trait]
impl<S: EntityStore> EntityStore for RecordingEntityStore<S> {
    async fn create(&self, collection: Collection, data: Value) -> HelioResult<EntityId> {
        if self.enter(AdapterCall::Create(collection)) {
            return Err(StorageError::InsertFailed {
                collection,
                reason: INJECTED.to_string(),
            }
            .into());
        }
        self.inner.create(collection, data).await
    }

    async fn get(&self, collection: Collection, id: EntityId) -> HelioResult<Option<Document>> {
        if self.enter(AdapterCall::Get(collection)) {
            return Err(StorageError::QueryFailed {
                collection,
                reason: INJECTED.to_string(),
            }
            .into());
        }
        self.inner.get(collection, id).await
    }

    async fn update(&self, collection: Collection, id: EntityId, partial: Value) -> HelioResult<()> {
        if self.enter(AdapterCall::Update(collection)) {
            return Err(StorageError::UpdateFailed {
                collection,
                id,
                reason: INJECTED.to_string(),
            }
            .into());
        }
        self.inner.update(collection, id, partial).await
    }

    async fn delete(&self, collection: Collection, id: EntityId) -> HelioResult<()> {
        if self.enter(AdapterCall::Delete(collection)) {
            return Err(StorageError::DeleteFailed {
                collection,
                id,
                reason: INJECTED.to_string(),
            }
            .into());
        }
        self.inner.delete(collection, id).await
    }

    async fn query(&self, collection: Collection, filter: &Filter) -> HelioResult<Vec<Document>> {
        if self.enter(AdapterCall::Query(collection)) {
            return Err(StorageError::QueryFailed {
                collection,
                reason: INJECTED.to_string(),
            }
            .into());
        }
        self.inner.query(collection, filter).await
    }

    async fn subscribe(
        &self,
        collection: Collection,
        filter: Filter,
        on_snapshot: SnapshotCallback,
    ) -> HelioResult<Subscription> {
        if self.enter(AdapterCall::Subscribe(collection)) {
            return Err(StorageError::SubscribeFailed {
                collection,
                reason: INJECTED.to_string(),
            }
            .into());
        }
        self.inner.subscribe(collection, filter, on_snapshot).await
    }

    fn server_timestamp(&self) -> Timestamp {
        self.inner.server_timestamp()
    }
}

/// Blob store wrapper that records calls and fails on demand.
pub struct RecordingBlobStore<B: BlobStore = InMemoryBlobStore> {
    inner: Arc<B>,
    log: CallLog,
    faults: Faults,
}

impl<B: BlobStore> RecordingBlobStore<B> {
    pub fn new(inner: Arc<B>, log: CallLog) -> Self {
        Self {
            inner,
            log,
            faults: Faults::default(),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Fail every call matching `predicate`. The call is still recorded.
    pub fn fail_when(&self, predicate: impl Fn(&AdapterCall) -> bool + Send + Sync + 'static) {
        self.faults.set(Box::new(predicate));
    }

    pub fn heal(&self) {
        self.faults.clear();
    }

    fn enter(&self, call: AdapterCall) -> bool {
        let fail = self.faults.hits(&call);
        self.log.push(call);
        fail
    }
}

#[async_trait]
impl<B: BlobStore> BlobStore for RecordingBlobStore<B> {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> HelioResult<()> {
        if self.enter(AdapterCall::Put(path.to_string())) {
            return Err(BlobError::UploadFailed {
                path: path.to_string(),
                reason: INJECTED.to_string(),
            }
            .into());
        }
        self.inner.put(path, bytes, content_type).await
    }

    async fn download_url(&self, path: &str) -> HelioResult<String> {
        if self.enter(AdapterCall::DownloadUrl(path.to_string())) {
            return Err(BlobError::LocatorFailed {
                path: path.to_string(),
                reason: INJECTED.to_string(),
            }
            .into());
        }
        self.inner.download_url(path).await
    }

    async fn delete(&self, path: &str) -> HelioResult<()> {
        if self.enter(AdapterCall::BlobDelete(path.to_string())) {
            return Err(BlobError::DeleteFailed {
                path: path.to_string(),
                reason: INJECTED.to_string(),
            }
            .into());
        }
        self.inner.delete(path).await
    }
}

/// In-memory adapters wrapped in recorders that share one call log.
pub struct Harness {
    pub entities: Arc<RecordingEntityStore>,
    pub blobs: Arc<RecordingBlobStore>,
    pub identity: Arc<SessionIdentity>,
    pub log: CallLog,
}

impl Harness {
    /// Fresh stores with nobody signed in.
    pub fn new() -> Self {
        let log = CallLog::new();
        Self {
            entities: Arc::new(RecordingEntityStore::new(
                Arc::new(InMemoryEntityStore::new()),
                log.clone(),
            )),
            blobs: Arc::new(RecordingBlobStore::new(
                Arc::new(InMemoryBlobStore::default()),
                log.clone(),
            )),
            identity: Arc::new(SessionIdentity::anonymous()),
            log,
        }
    }

    /// Fresh stores with `user` signed in.
    pub fn signed_in(user: impl Into<UserId>) -> Self {
        let harness = Self::new();
        harness.identity.sign_in(user);
        harness
    }

    pub fn entity_store(&self) -> &InMemoryEntityStore {
        self.entities.inner()
    }

    pub fn blob_store(&self) -> &InMemoryBlobStore {
        self.blobs.inner()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating HELIO record types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    // === Identity Type Generators ===

    /// Generate a random UUID (for generic ID generation).
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_client_id() -> impl Strategy<Value = ClientId> {
        arb_uuid().prop_map(ClientId::new)
    }

    pub fn arb_project_id() -> impl Strategy<Value = ProjectId> {
        arb_uuid().prop_map(ProjectId::new)
    }

    /// Generate a signed-in user id.
    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        "[a-zA-Z0-9]{8,28}".prop_map(UserId::new)
    }

    // === Enum Generators ===

    pub fn arb_file_type() -> impl Strategy<Value = FileType> {
        prop_oneof![
            Just(FileType::SitePlan),
            Just(FileType::Permit),
            Just(FileType::Contract),
            Just(FileType::Other),
        ]
    }

    pub fn arb_project_status() -> impl Strategy<Value = ProjectStatus> {
        prop_oneof![
            Just(ProjectStatus::Planning),
            Just(ProjectStatus::InProgress),
            Just(ProjectStatus::Completed),
            Just(ProjectStatus::Awaiting),
        ]
    }

    // === Record Generators ===

    /// Generate a client that passes validation.
    pub fn arb_client_record() -> impl Strategy<Value = ClientRecord> {
        (
            "[A-Z][a-z]{1,12}( [A-Z][a-z]{1,12})?",
            "[a-z]{1,10}",
            "[a-z]{2,10}\\.(com|org|net)",
            proptest::option::of("[0-9]{7,11}"),
            proptest::option::of("[A-Z][a-z]{3,12}"),
        )
            .prop_map(|(name, user, domain, phone, city)| ClientRecord {
                phone,
                city,
                ..ClientRecord::new(name, format!("{}@{}", user, domain))
            })
    }

    pub fn arb_system_spec() -> impl Strategy<Value = SystemSpec> {
        (
            proptest::option::of("[A-Z][a-z]{2,10}"),
            proptest::option::of(1u32..200),
            proptest::option::of(0.5f64..500.0),
        )
            .prop_map(|(panel_brand, number_of_panels, system_size_kw)| SystemSpec {
                panel_brand,
                number_of_panels,
                system_size_kw,
                ..Default::default()
            })
    }

    /// Generate a project draft that passes validation.
    pub fn arb_new_project() -> impl Strategy<Value = NewProject> {
        (
            "[A-Z][a-zA-Z ]{2,30}",
            proptest::option::of("[a-zA-Z ,.]{0,80}"),
            arb_system_spec(),
            arb_project_status(),
        )
            .prop_map(|(name, description, system, status)| NewProject {
                description,
                system,
                status,
                ..NewProject::new(name)
            })
    }

    /// Generate a file name that may contain characters needing sanitizing.
    pub fn arb_file_name() -> impl Strategy<Value = String> {
        ("[a-zA-Z0-9 ()#&%._-]{1,24}", prop_oneof![Just("pdf"), Just("png"), Just("dwg")])
            .prop_map(|(stem, ext)| format!("{}.{}", stem, ext))
    }

    pub fn arb_file_upload() -> impl Strategy<Value = FileUpload> {
        (
            arb_file_name(),
            prop::collection::vec(any::<u8>(), 0..256),
            proptest::option::of(prop_oneof![
                Just("application/pdf".to_string()),
                Just("image/png".to_string()),
            ]),
        )
            .prop_map(|(name, bytes, content_type)| FileUpload {
                name,
                content_type,
                bytes,
            })
    }

    /// Generate any combination of filled upload slots.
    pub fn arb_file_slots() -> impl Strategy<Value = ProjectFileSlots> {
        (
            proptest::option::of(arb_file_upload()),
            proptest::option::of(arb_file_upload()),
            proptest::option::of(arb_file_upload()),
            proptest::option::of(arb_file_upload()),
        )
            .prop_map(|(site_plan, permit, contract, other)| ProjectFileSlots {
                site_plan,
                permit,
                contract,
                other,
            })
    }

    /// Generate a config that passes validation.
    pub fn arb_valid_config() -> impl Strategy<Value = IntakeConfig> {
        ("[a-z]{1,12}", "[a-z]{1,12}", any::<bool>()).prop_map(
            |(storage_prefix, unknown_identity, compensate_on_failure)| IntakeConfig {
                storage_prefix,
                unknown_identity,
                compensate_on_failure,
                ..IntakeConfig::default()
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// A valid client.
    pub fn client() -> ClientRecord {
        ClientRecord {
            phone: Some("5551234567".to_string()),
            city: Some("Springfield".to_string()),
            ..ClientRecord::new("Ana Souza", "ana@example.com")
        }
    }

    /// A valid project draft with no client or owner stamped yet.
    pub fn project_draft() -> NewProject {
        NewProject {
            description: Some("12 panel rooftop array".to_string()),
            system: SystemSpec {
                panel_brand: Some("Sunmax".to_string()),
                number_of_panels: Some(12),
                system_size_kw: Some(6.6),
                ..Default::default()
            },
            ..NewProject::new("Rooftop array")
        }
    }

    pub fn upload(name: &str) -> FileUpload {
        FileUpload::new(name, name.as_bytes().to_vec()).with_content_type("application/pdf")
    }

    /// All four slots filled.
    pub fn all_slots() -> ProjectFileSlots {
        ProjectFileSlots::default()
            .with(FileType::SitePlan, upload("site plan.pdf"))
            .with(FileType::Permit, upload("permit.pdf"))
            .with(FileType::Contract, upload("contract.pdf"))
            .with(FileType::Other, upload("notes.pdf"))
    }

    /// Only the site plan and other slots filled.
    pub fn sparse_slots() -> ProjectFileSlots {
        ProjectFileSlots::default()
            .with(FileType::SitePlan, upload("site.pdf"))
            .with(FileType::Other, FileUpload::new("misc.bin", vec![0u8, 1, 2]))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for HELIO-specific validation.

    use super::*;

    /// Assert that a HelioResult failed with the given kind.
    #[track_caller]
    pub fn assert_kind<T: std::fmt::Debug>(result: &HelioResult<T>, kind: ErrorKind) {
        match result {
            Err(e) => assert_eq!(e.kind(), kind, "Wrong error kind for {:?}", e),
            Ok(v) => panic!("Expected {:?} error, got Ok({:?})", kind, v),
        }
    }

    /// Assert that a submission failed part way, at `step`, after
    /// `committed` stored writes.
    #[track_caller]
    pub fn assert_partial_at<T: std::fmt::Debug>(
        result: &HelioResult<T>,
        step: SubmitStep,
        committed: usize,
    ) {
        match result {
            Err(HelioError::Submission(SubmissionError::Partial {
                step: s,
                committed: c,
                ..
            })) => {
                assert_eq!(*s, step, "Wrong failed step");
                assert_eq!(*c, committed, "Wrong committed write count");
            }
            other => panic!("Expected partial submission at {}, got: {:?}", step, other),
        }
    }

    /// Assert that every call in `expected` appears in `calls` in order.
    #[track_caller]
    pub fn assert_call_order(calls: &[AdapterCall], expected: &[AdapterCall]) {
        assert_eq!(
            calls.len(),
            expected.len(),
            "Call count mismatch: {:#?}",
            calls
        );
        for (i, (actual, wanted)) in calls.iter().zip(expected).enumerate() {
            match (actual, wanted) {
                (AdapterCall::Put(a), AdapterCall::Put(w))
                | (AdapterCall::DownloadUrl(a), AdapterCall::DownloadUrl(w)) => {
                    assert!(a.contains(w.as_str()), "Call {}: {:?} does not match {:?}", i, actual, wanted);
                }
                _ => assert_eq!(actual, wanted, "Call {} out of order", i),
            }
        }
    }

    /// Assert that a config passes validation.
    #[track_caller]
    pub fn assert_config_valid(config: &IntakeConfig) {
        if let Err(e) = config.validate() {
            panic!("Config validation failed: {:?}", e);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
