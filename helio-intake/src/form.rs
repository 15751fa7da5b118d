//! In-progress intake form.

use helio_core::{ClientRecord, NewProject, ProjectFileSlots};

/// Form data being edited before submission. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormDraft {
    pub client: Option<ClientRecord>,
    pub project: Option<NewProject>,
    pub files: Option<ProjectFileSlots>,
}

impl FormDraft {
    pub fn new(client: ClientRecord, project: NewProject, files: ProjectFileSlots) -> Self {
        Self {
            client: Some(client),
            project: Some(project),
            files: Some(files),
        }
    }

    /// True if any part of the form holds data.
    pub fn has_data(&self) -> bool {
        self.client.is_some() || self.project.is_some() || self.files.is_some()
    }

    /// Split into the parts `submit` needs, if client and project are set.
    /// Missing files mean no uploads.
    pub fn into_submission(self) -> Option<(ClientRecord, NewProject, ProjectFileSlots)> {
        Some((self.client?, self.project?, self.files.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_draft_has_no_data() {
        assert!(!FormDraft::default().has_data());
        assert!(FormDraft::default().into_submission().is_none());
    }

    #[test]
    fn test_any_part_counts_as_data() {
        let draft = FormDraft {
            files: Some(ProjectFileSlots::default()),
            ..Default::default()
        };
        assert!(draft.has_data());
    }

    #[test]
    fn test_into_submission_defaults_files() {
        let draft = FormDraft {
            client: Some(ClientRecord::new("Ana", "ana@example.com")),
            project: Some(NewProject::new("Roof")),
            files: None,
        };
        let (_, project, files) = draft.into_submission().unwrap();
        assert_eq!(project.name, "Roof");
        assert!(files.is_empty());
    }
}
