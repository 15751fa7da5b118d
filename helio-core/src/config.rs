//! Configuration types

use crate::{ConfigError, HelioError, HelioResult, UserId};
use serde::{Deserialize, Serialize};

/// Default prefix under which project files are stored in the blob store.
pub const DEFAULT_STORAGE_PREFIX: &str = "projects";

/// Identity recorded when neither an uploader nor a signed-in user is known.
pub const DEFAULT_UNKNOWN_IDENTITY: &str = "unknown";

/// MIME type recorded when an upload does not carry one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Version stamped on every newly created file record.
pub const INITIAL_FILE_VERSION: u32 = 1;

/// Configuration for the intake core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// First path segment of every stored project file.
    pub storage_prefix: String,
    /// Sentinel identity used when nobody is signed in.
    pub unknown_identity: String,
    /// Fallback MIME type for uploads without a content type.
    pub default_mime_type: String,
    /// Undo already-stored writes when a later submission step fails.
    pub compensate_on_failure: bool,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            unknown_identity: DEFAULT_UNKNOWN_IDENTITY.to_string(),
            default_mime_type: DEFAULT_MIME_TYPE.to_string(),
            compensate_on_failure: false,
        }
    }
}

impl IntakeConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `HELIO_STORAGE_PREFIX`: Blob path prefix (default: projects)
    /// - `HELIO_UNKNOWN_IDENTITY`: Sentinel uploader id (default: unknown)
    /// - `HELIO_DEFAULT_MIME_TYPE`: Fallback MIME type (default: application/octet-stream)
    /// - `HELIO_COMPENSATE_ON_FAILURE`: Undo stored writes on failure (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            storage_prefix: std::env::var("HELIO_STORAGE_PREFIX")
                .unwrap_or(defaults.storage_prefix),
            unknown_identity: std::env::var("HELIO_UNKNOWN_IDENTITY")
                .unwrap_or(defaults.unknown_identity),
            default_mime_type: std::env::var("HELIO_DEFAULT_MIME_TYPE")
                .unwrap_or(defaults.default_mime_type),
            compensate_on_failure: std::env::var("HELIO_COMPENSATE_ON_FAILURE")
                .ok()
                .map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.compensate_on_failure),
        }
    }

    /// Enable or disable compensation of partial submissions.
    pub fn with_compensation(mut self, enabled: bool) -> Self {
        self.compensate_on_failure = enabled;
        self
    }

    /// The sentinel identity as a `UserId`.
    pub fn unknown_user(&self) -> UserId {
        UserId::new(self.unknown_identity.clone())
    }

    /// Validate the configuration.
    /// Returns Ok(()) if valid, Err(HelioError::Config) if invalid.
    pub fn validate(&self) -> HelioResult<()> {
        let prefix = self.storage_prefix.trim_matches('/');
        if prefix.is_empty() {
            return Err(HelioError::Config(ConfigError::InvalidValue {
                field: "storage_prefix".to_string(),
                value: self.storage_prefix.clone(),
                reason: "storage_prefix must not be empty".to_string(),
            }));
        }

        if self.unknown_identity.trim().is_empty() {
            return Err(HelioError::Config(ConfigError::InvalidValue {
                field: "unknown_identity".to_string(),
                value: self.unknown_identity.clone(),
                reason: "unknown_identity must not be empty".to_string(),
            }));
        }

        if !self.default_mime_type.contains('/') {
            return Err(HelioError::Config(ConfigError::InvalidValue {
                field: "default_mime_type".to_string(),
                value: self.default_mime_type.clone(),
                reason: "default_mime_type must look like type/subtype".to_string(),
            }));
        }

        Ok(())
    }
}
