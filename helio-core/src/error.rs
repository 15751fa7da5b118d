//! Error types for HELIO operations

use crate::{Collection, FileType};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Entity store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Document not found: {collection} with id {id}")]
    NotFound { collection: Collection, id: Uuid },

    #[error("Insert failed for {collection}: {reason}")]
    InsertFailed { collection: Collection, reason: String },

    #[error("Update failed for {collection} with id {id}: {reason}")]
    UpdateFailed {
        collection: Collection,
        id: Uuid,
        reason: String,
    },

    #[error("Delete failed for {collection} with id {id}: {reason}")]
    DeleteFailed {
        collection: Collection,
        id: Uuid,
        reason: String,
    },

    #[error("Query failed on {collection}: {reason}")]
    QueryFailed { collection: Collection, reason: String },

    #[error("Subscription failed on {collection}: {reason}")]
    SubscribeFailed { collection: Collection, reason: String },

    #[error("Malformed document in {collection}: {reason}")]
    Serialization { collection: Collection, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Blob store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlobError {
    #[error("Upload failed for {path}: {reason}")]
    UploadFailed { path: String, reason: String },

    #[error("Download URL unavailable for {path}: {reason}")]
    LocatorFailed { path: String, reason: String },

    #[error("Blob not found: {path}")]
    NotFound { path: String },

    #[error("Delete failed for {path}: {reason}")]
    DeleteFailed { path: String, reason: String },
}

/// Authentication errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No user logged in")]
    NotAuthenticated,
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Step of a submission run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitStep {
    Validate,
    CreateClient,
    CreateProject,
    UploadFile(FileType),
    ResolveDownloadUrl(FileType),
    RecordFile(FileType),
}

impl fmt::Display for SubmitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitStep::Validate => f.write_str("validate"),
            SubmitStep::CreateClient => f.write_str("create client"),
            SubmitStep::CreateProject => f.write_str("create project"),
            SubmitStep::UploadFile(t) => write!(f, "upload {}", t),
            SubmitStep::ResolveDownloadUrl(t) => write!(f, "resolve download url for {}", t),
            SubmitStep::RecordFile(t) => write!(f, "record {} metadata", t),
        }
    }
}

/// Submission failures that happened after something was durably stored.
#[derive(Debug, Clone, Error)]
pub enum SubmissionError {
    #[error("Submission failed at {step} after {committed} write(s) were stored: {source}")]
    Partial {
        step: SubmitStep,
        committed: usize,
        #[source]
        source: Box<HelioError>,
    },
}

/// Master error type for all HELIO errors.
#[derive(Debug, Clone, Error)]
pub enum HelioError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Blob error: {0}")]
    Blob(#[from] BlobError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),
}

/// Coarse classification of a failure, for callers that only branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotAuthenticated,
    NotFound,
    AdapterFailure,
    PartialSubmission,
    Invalid,
}

impl HelioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HelioError::Auth(AuthError::NotAuthenticated) => ErrorKind::NotAuthenticated,
            HelioError::Storage(StorageError::NotFound { .. })
            | HelioError::Blob(BlobError::NotFound { .. }) => ErrorKind::NotFound,
            HelioError::Storage(_) | HelioError::Blob(_) => ErrorKind::AdapterFailure,
            HelioError::Submission(SubmissionError::Partial { .. }) => {
                ErrorKind::PartialSubmission
            }
            HelioError::Validation(_) | HelioError::Config(_) => ErrorKind::Invalid,
        }
    }
}

/// Result type alias for HELIO operations.
pub type HelioResult<T> = Result<T, HelioError>;

// =============================================================================
// TESTS
// =============================================================================
