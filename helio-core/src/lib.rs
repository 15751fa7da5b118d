//! HELIO Core - Record Types
//!
//! Pure data structures for the project intake workflow: clients, projects,
//! file metadata, their identifiers, errors, filters, and configuration.
//! Every other crate in the workspace depends on this one.

pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod filter;
pub mod identity;

pub use config::{
    IntakeConfig, DEFAULT_MIME_TYPE, DEFAULT_STORAGE_PREFIX, DEFAULT_UNKNOWN_IDENTITY,
    INITIAL_FILE_VERSION,
};
pub use entities::{
    ClientRecord, ClientUpdate, FileMetadataRecord, FileUpdate, FileUpload, NewProject,
    ProjectFileSlots, ProjectRecord, ProjectUpdate, StoredFile, SystemSpec,
};
pub use enums::{
    Collection, FileType, FileTypeParseError, ProjectStatus, ProjectStatusParseError,
};
pub use error::{
    AuthError, BlobError, ConfigError, ErrorKind, HelioError, HelioResult, StorageError,
    SubmissionError, SubmitStep, ValidationError,
};
pub use filter::{Filter, FilterExpr, FilterOperator};
pub use identity::{
    new_entity_id, ClientId, EntityId, EntityIdType, FileId, ProjectId, Timestamp, UserId,
};
