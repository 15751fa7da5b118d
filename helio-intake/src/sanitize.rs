//! Storage path construction for uploaded files.

use helio_core::{FileType, ProjectId};
use once_cell::sync::Lazy;
use regex::Regex;

static UNSAFE_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9._-]").expect("Invalid file name regex"));

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
///
/// Length is preserved in characters: each offending character becomes a
/// single underscore.
pub fn sanitize_file_name(name: &str) -> String {
    UNSAFE_NAME_CHARS.replace_all(name, "_").into_owned()
}

/// Compose `{prefix}/{project}/{slot}_{millis}_{safe name}`.
pub fn storage_path(
    prefix: &str,
    project_id: ProjectId,
    slot: FileType,
    timestamp_millis: i64,
    file_name: &str,
) -> String {
    format!(
        "{}/{}/{}_{}_{}",
        prefix.trim_matches('/'),
        project_id,
        slot.as_str(),
        timestamp_millis,
        sanitize_file_name(file_name)
    )
}
