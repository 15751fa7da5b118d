//! Enum types for HELIO records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// COLLECTIONS
// ============================================================================

/// Logical document collection in the entity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Clients,
    Projects,
    Files,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Clients, Collection::Projects, Collection::Files];

    /// Collection name as used by the document store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Clients => "clients",
            Collection::Projects => "projects",
            Collection::Files => "files",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PROJECT STATUS
// ============================================================================

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProjectStatus {
    /// Intake accepted, design not started
    #[default]
    Planning,
    /// Design or installation under way
    InProgress,
    Completed,
    /// Blocked on the client or a third party (permit office, utility)
    Awaiting,
}

impl ProjectStatus {
    /// Convert to stored string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "Planning",
            ProjectStatus::InProgress => "InProgress",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::Awaiting => "Awaiting",
        }
    }

    /// Parse from stored string representation.
    pub fn from_db_str(s: &str) -> Result<Self, ProjectStatusParseError> {
        match s.to_lowercase().as_str() {
            "planning" => Ok(ProjectStatus::Planning),
            "inprogress" | "in_progress" => Ok(ProjectStatus::InProgress),
            "completed" => Ok(ProjectStatus::Completed),
            "awaiting" => Ok(ProjectStatus::Awaiting),
            _ => Err(ProjectStatusParseError(s.to_string())),
        }
    }

    /// Whether the project still needs work.
    pub fn is_open(&self) -> bool {
        !matches!(self, ProjectStatus::Completed)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = ProjectStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid project status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectStatusParseError(pub String);

impl fmt::Display for ProjectStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid project status: {}", self.0)
    }
}

impl std::error::Error for ProjectStatusParseError {}

// ============================================================================
// FILE TYPES
// ============================================================================

/// Named document slot on a project. Also the `type` of a stored file record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileType {
    SitePlan,
    Permit,
    Contract,
    Other,
}

impl FileType {
    /// Slots in upload order.
    pub const ALL: [FileType; 4] = [
        FileType::SitePlan,
        FileType::Permit,
        FileType::Contract,
        FileType::Other,
    ];

    /// Slot name as stored and as used in storage paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::SitePlan => "sitePlan",
            FileType::Permit => "permit",
            FileType::Contract => "contract",
            FileType::Other => "other",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, FileTypeParseError> {
        match s {
            "sitePlan" => Ok(FileType::SitePlan),
            "permit" => Ok(FileType::Permit),
            "contract" => Ok(FileType::Contract),
            "other" => Ok(FileType::Other),
            _ => Err(FileTypeParseError(s.to_string())),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = FileTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid file type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTypeParseError(pub String);

impl fmt::Display for FileTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid file type: {}", self.0)
    }
}

impl std::error::Error for FileTypeParseError {}
