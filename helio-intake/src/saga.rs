//! Compensation log for submissions.
//!
//! Every durable write made during a submission is recorded here in order.
//! When compensation is enabled and a later step fails, the log is unwound
//! in reverse so nothing from the failed run remains. Unwinding is best
//! effort: a failed undo is logged and reported, and the rest still run.

use helio_core::{ClientId, FileId, FileType, HelioError, ProjectId};
use helio_storage::{BlobStore, EntityStore, EntityStoreExt};
use std::fmt;

/// A write that reached a store and may need undoing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletedStep {
    ClientCreated(ClientId),
    ProjectCreated(ProjectId),
    BlobUploaded { slot: FileType, path: String },
    FileRecorded { slot: FileType, id: FileId },
}

impl fmt::Display for CompletedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletedStep::ClientCreated(id) => write!(f, "client {}", id),
            CompletedStep::ProjectCreated(id) => write!(f, "project {}", id),
            CompletedStep::BlobUploaded { slot, path } => write!(f, "{} blob {}", slot, path),
            CompletedStep::FileRecorded { slot, id } => write!(f, "{} record {}", slot, id),
        }
    }
}

/// Outcome of unwinding a [`CompensationLog`].
#[derive(Debug, Default)]
pub struct CompensationReport {
    /// Steps undone, in the order they were undone.
    pub undone: Vec<CompletedStep>,
    /// Steps whose undo failed.
    pub failed: Vec<(CompletedStep, HelioError)>,
}

impl CompensationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Clients that were deleted and should be evicted from caches.
    pub fn removed_clients(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.undone.iter().filter_map(|step| match step {
            CompletedStep::ClientCreated(id) => Some(*id),
            _ => None,
        })
    }
}

/// Ordered record of durable writes made by one submission.
#[derive(Debug, Clone, Default)]
pub struct CompensationLog {
    steps: Vec<CompletedStep>,
}

impl CompensationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: CompletedStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[CompletedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Undo every recorded step, newest first.
    pub async fn unwind<E, B>(self, entities: &E, blobs: &B) -> CompensationReport
    where
        E: EntityStore + ?Sized,
        B: BlobStore + ?Sized,
    {
        let mut report = CompensationReport::default();

        for step in self.steps.into_iter().rev() {
            let result = match &step {
                CompletedStep::FileRecorded { id, .. } => entities.file_delete(*id).await,
                CompletedStep::BlobUploaded { path, .. } => blobs.delete(path).await,
                CompletedStep::ProjectCreated(id) => entities.project_delete(*id).await,
                CompletedStep::ClientCreated(id) => entities.client_delete(*id).await,
            };

            match result {
                Ok(()) => {
                    tracing::debug!(step = %step, "Compensated");
                    report.undone.push(step);
                }
                Err(e) => {
                    tracing::warn!(step = %step, error = %e, "Compensation step failed");
                    report.failed.push((step, e));
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helio_core::{ClientRecord, EntityIdType, NewProject, UserId};
    use helio_storage::{InMemoryBlobStore, InMemoryEntityStore};

    #[tokio::test]
    async fn test_unwind_removes_everything_newest_first() {
        let entities = InMemoryEntityStore::new();
        let blobs = InMemoryBlobStore::default();
        let mut log = CompensationLog::new();

        let client_id = entities
            .client_create(&ClientRecord::new("Ana", "ana@example.com"))
            .await
            .unwrap();
        log.record(CompletedStep::ClientCreated(client_id));

        let mut draft = NewProject::new("Roof");
        draft.client_id = Some(client_id);
        draft.owner_user_id = Some(UserId::new("u1"));
        let project = entities.project_create(&draft).await.unwrap();
        log.record(CompletedStep::ProjectCreated(project.id));

        blobs.put("projects/x/permit", b"1", "text/plain").await.unwrap();
        log.record(CompletedStep::BlobUploaded {
            slot: FileType::Permit,
            path: "projects/x/permit".to_string(),
        });

        let report = log.unwind(&entities, &blobs).await;
        assert!(report.is_clean());
        assert_eq!(report.undone.len(), 3);
        assert!(matches!(report.undone[0], CompletedStep::BlobUploaded { .. }));
        assert_eq!(report.removed_clients().collect::<Vec<_>>(), vec![client_id]);

        assert!(entities.client_get(client_id).await.unwrap().is_none());
        assert!(entities.project_get(project.id).await.unwrap().is_none());
        assert!(blobs.is_empty());
    }

    #[tokio::test]
    async fn test_unwind_of_already_missing_records_is_clean() {
        let entities = InMemoryEntityStore::new();
        let blobs = InMemoryBlobStore::default();
        let mut log = CompensationLog::new();
        log.record(CompletedStep::FileRecorded {
            slot: FileType::Other,
            id: FileId::now_v7(),
        });

        let report = log.unwind(&entities, &blobs).await;
        assert!(report.is_clean());
        assert_eq!(report.undone.len(), 1);
    }
}
