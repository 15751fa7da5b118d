//! Submission orchestrator.
//!
//! A submission runs strictly in sequence:
//!
//! 1. resolve the acting identity (explicit uploader, signed-in user, or the
//!    configured sentinel)
//! 2. validate the client and project drafts
//! 3. create the client and write it through to the client cache
//! 4. create the project stamped with the client id and acting identity
//! 5. for each filled slot in `sitePlan, permit, contract, other` order:
//!    upload the bytes, resolve the download URL, record file metadata
//!
//! The first failure aborts the run. Writes that already reached a store
//! are kept unless [`IntakeConfig::compensate_on_failure`] is set.

use std::sync::Arc;

use chrono::Utc;
use helio_core::{
    ClientId, ClientRecord, FileMetadataRecord, FileType, FileUpload, HelioError, HelioResult,
    IntakeConfig, NewProject, ProjectFileSlots, ProjectRecord, SubmissionError, SubmitStep,
    UserId, INITIAL_FILE_VERSION,
};
use helio_storage::EntityStoreExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::saga::{CompensationLog, CompletedStep};
use crate::sanitize::storage_path;
use crate::{Adapters, SharedClientCache};

/// Observable state of the orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionState {
    /// True while a submission is running.
    pub submitting: bool,
    /// Message from the most recent failed submission. Cleared on start.
    pub error: Option<String>,
    /// Project created by the most recent successful submission.
    pub current_project: Option<ProjectRecord>,
    /// Client created by the most recent submission that got that far.
    pub last_submitted_client_id: Option<ClientId>,
}

type StepResult<T> = Result<T, (SubmitStep, HelioError)>;

trait AtStep<T> {
    fn at(self, step: SubmitStep) -> StepResult<T>;
}

impl<T> AtStep<T> for HelioResult<T> {
    fn at(self, step: SubmitStep) -> StepResult<T> {
        self.map_err(|e| (step, e))
    }
}

/// Resets `submitting` even if the submit future is dropped mid-run.
struct SubmittingFlag<'a>(&'a watch::Sender<SubmissionState>);

impl Drop for SubmittingFlag<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|s| std::mem::replace(&mut s.submitting, false));
    }
}

/// Runs project submissions against the configured adapters.
pub struct SubmissionOrchestrator {
    adapters: Adapters,
    clients: Arc<SharedClientCache>,
    config: IntakeConfig,
    state: watch::Sender<SubmissionState>,
}

impl SubmissionOrchestrator {
    pub fn new(adapters: Adapters, clients: Arc<SharedClientCache>, config: IntakeConfig) -> Self {
        let (state, _) = watch::channel(SubmissionState::default());
        Self {
            adapters,
            clients,
            config,
            state,
        }
    }

    /// Submit a client, a project, and its files.
    ///
    /// Failures before anything was stored return the underlying error.
    /// Failures after at least one durable write return
    /// [`SubmissionError::Partial`] naming the failed step. Either way the
    /// message is also published in [`SubmissionState::error`].
    pub async fn submit(
        &self,
        client: ClientRecord,
        project: NewProject,
        files: &ProjectFileSlots,
        uploader_id: Option<UserId>,
    ) -> HelioResult<ProjectRecord> {
        self.state.send_modify(|s| {
            s.submitting = true;
            s.error = None;
        });
        let _flag = SubmittingFlag(&self.state);

        let outcome = self.run(client, project, files, uploader_id).await;

        self.state.send_modify(|s| {
            s.submitting = false;
            match &outcome {
                Ok(project) => s.current_project = Some(project.clone()),
                Err(e) => s.error = Some(e.to_string()),
            }
        });
        outcome
    }

    /// The acting identity: explicit uploader, else the signed-in user, else
    /// the configured sentinel. Empty ids count as absent.
    pub fn resolve_identity(&self, uploader_id: Option<UserId>) -> UserId {
        uploader_id
            .filter(|u| !u.as_str().is_empty())
            .or_else(|| {
                self.adapters
                    .identity
                    .current_identity()
                    .filter(|u| !u.as_str().is_empty())
            })
            .unwrap_or_else(|| self.config.unknown_user())
    }

    pub fn state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    pub fn is_submitting(&self) -> bool {
        self.state.borrow().submitting
    }

    pub fn current_project(&self) -> Option<ProjectRecord> {
        self.state.borrow().current_project.clone()
    }

    pub fn last_submitted_client_id(&self) -> Option<ClientId> {
        self.state.borrow().last_submitted_client_id
    }

    /// Forget the current project, last client, and error message.
    pub fn reset(&self) {
        self.state.send_modify(|s| {
            s.error = None;
            s.current_project = None;
            s.last_submitted_client_id = None;
        });
    }

    async fn run(
        &self,
        client: ClientRecord,
        project: NewProject,
        files: &ProjectFileSlots,
        uploader_id: Option<UserId>,
    ) -> HelioResult<ProjectRecord> {
        let acting = self.resolve_identity(uploader_id);

        if let Err(e) = client.validate().and_then(|_| project.validate()) {
            warn!(step = %SubmitStep::Validate, error = %e, "Submission rejected");
            return Err(e.into());
        }

        let mut log = CompensationLog::new();
        match self.write_all(client, project, files, &acting, &mut log).await {
            Ok(project) => Ok(project),
            Err((step, source)) => Err(self.fail(step, source, log).await),
        }
    }

    async fn write_all(
        &self,
        client: ClientRecord,
        mut project: NewProject,
        files: &ProjectFileSlots,
        acting: &UserId,
        log: &mut CompensationLog,
    ) -> StepResult<ProjectRecord> {
        let entities = &self.adapters.entities;

        let client_id = entities
            .client_create(&client)
            .await
            .at(SubmitStep::CreateClient)?;
        log.record(CompletedStep::ClientCreated(client_id));
        self.clients.insert(client_id, client);
        self.state
            .send_modify(|s| s.last_submitted_client_id = Some(client_id));
        info!(client_id = %client_id, "Created client");

        project.client_id = Some(client_id);
        project.owner_user_id = Some(acting.clone());
        let created = entities
            .project_create(&project)
            .await
            .at(SubmitStep::CreateProject)?;
        log.record(CompletedStep::ProjectCreated(created.id));
        info!(project_id = %created.id, user_id = %acting, "Created project");

        let mut stored = 0usize;
        for (slot, upload) in files.filled() {
            self.store_file(&created, slot, upload, acting, log).await?;
            stored += 1;
        }
        info!(project_id = %created.id, files = stored, "Stored project files");

        Ok(created)
    }

    async fn store_file(
        &self,
        project: &ProjectRecord,
        slot: FileType,
        upload: &FileUpload,
        acting: &UserId,
        log: &mut CompensationLog,
    ) -> StepResult<()> {
        let path = storage_path(
            &self.config.storage_prefix,
            project.id,
            slot,
            Utc::now().timestamp_millis(),
            &upload.name,
        );
        let mime_type = upload
            .content_type
            .clone()
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| self.config.default_mime_type.clone());

        self.adapters
            .blobs
            .put(&path, &upload.bytes, &mime_type)
            .await
            .at(SubmitStep::UploadFile(slot))?;
        log.record(CompletedStep::BlobUploaded {
            slot,
            path: path.clone(),
        });

        let download_url = self
            .adapters
            .blobs
            .download_url(&path)
            .await
            .at(SubmitStep::ResolveDownloadUrl(slot))?;

        let metadata = FileMetadataRecord {
            project_id: project.id,
            file_type: slot,
            name: upload.name.clone(),
            storage_path: path,
            download_url,
            mime_type,
            size: upload.size(),
            uploaded_by: acting.clone(),
            uploaded_at: self.adapters.entities.server_timestamp(),
            version: INITIAL_FILE_VERSION,
        };
        let file_id = self
            .adapters
            .entities
            .file_create(&metadata)
            .await
            .at(SubmitStep::RecordFile(slot))?;
        log.record(CompletedStep::FileRecorded { slot, id: file_id });
        debug!(file_id = %file_id, slot = %slot, path = %metadata.storage_path, "Recorded file");

        Ok(())
    }

    async fn fail(&self, step: SubmitStep, source: HelioError, log: CompensationLog) -> HelioError {
        let committed = log.len();
        error!(step = %step, committed, error = %source, "Submission failed");

        if committed == 0 {
            return source;
        }

        if self.config.compensate_on_failure {
            let report = log
                .unwind(self.adapters.entities.as_ref(), self.adapters.blobs.as_ref())
                .await;
            for client_id in report.removed_clients() {
                self.clients.evict(client_id);
                self.state.send_if_modified(|s| {
                    if s.last_submitted_client_id == Some(client_id) {
                        s.last_submitted_client_id = None;
                        return true;
                    }
                    false
                });
            }
            if report.is_clean() {
                info!(undone = report.undone.len(), "Compensated failed submission");
            } else {
                warn!(
                    undone = report.undone.len(),
                    failed = report.failed.len(),
                    "Compensation left writes behind"
                );
            }
        }

        SubmissionError::Partial {
            step,
            committed,
            source: Box::new(source),
        }
        .into()
    }
}
