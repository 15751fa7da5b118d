//! Project store facade.
//!
//! Owns the client cache, the submission orchestrator, the live project
//! list, and the form draft for one session. Build it once with
//! [`ProjectStore::init`] and drive the listener from authentication events
//! through [`ProjectStore::on_authenticated`] and
//! [`ProjectStore::on_unauthenticated`].

use std::sync::Arc;

use helio_core::{
    ClientId, ClientRecord, HelioResult, IntakeConfig, NewProject, ProjectFileSlots,
    ProjectRecord, UserId, ValidationError,
};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::form::FormDraft;
use crate::submission::SubmissionOrchestrator;
use crate::subscription::LiveProjects;
use crate::{Adapters, SharedClientCache};

pub struct ProjectStore {
    config: IntakeConfig,
    clients: Arc<SharedClientCache>,
    submissions: SubmissionOrchestrator,
    projects: LiveProjects,
    form: watch::Sender<FormDraft>,
}

impl ProjectStore {
    /// Validate `config` and wire every component to `adapters`.
    pub fn init(adapters: Adapters, config: IntakeConfig) -> HelioResult<Self> {
        config.validate()?;

        let clients = Arc::new(SharedClientCache::new(Arc::clone(&adapters.entities)));
        let projects = LiveProjects::new(
            Arc::clone(&adapters.entities),
            Arc::clone(&adapters.identity),
        );
        let submissions =
            SubmissionOrchestrator::new(adapters, Arc::clone(&clients), config.clone());
        let (form, _) = watch::channel(FormDraft::default());

        info!(
            storage_prefix = %config.storage_prefix,
            compensate_on_failure = config.compensate_on_failure,
            "Project store initialized"
        );

        Ok(Self {
            config,
            clients,
            submissions,
            projects,
            form,
        })
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn clients(&self) -> &SharedClientCache {
        &self.clients
    }

    pub fn submissions(&self) -> &SubmissionOrchestrator {
        &self.submissions
    }

    pub fn projects(&self) -> &LiveProjects {
        &self.projects
    }

    // === Clients ===

    pub fn get_cached_client(&self, id: ClientId) -> Option<ClientRecord> {
        self.clients.get_cached(id)
    }

    pub async fn load_client_by_id(&self, id: ClientId) -> Option<ClientRecord> {
        self.clients.load_by_id(id).await
    }

    pub async fn get_or_load_client(&self, id: ClientId) -> Option<ClientRecord> {
        self.clients.get_or_load(id).await
    }

    pub fn clear_client_cache(&self) {
        self.clients.clear();
    }

    // === Submission ===

    pub async fn submit(
        &self,
        client: ClientRecord,
        project: NewProject,
        files: &ProjectFileSlots,
        uploader_id: Option<UserId>,
    ) -> HelioResult<ProjectRecord> {
        self.submissions
            .submit(client, project, files, uploader_id)
            .await
    }

    /// Submit the current form draft. The draft is cleared on success and
    /// kept on failure so it can be retried.
    pub async fn submit_form(&self, uploader_id: Option<UserId>) -> HelioResult<ProjectRecord> {
        let draft = self.form.borrow().clone();
        let Some((client, project, files)) = draft.into_submission() else {
            return Err(ValidationError::RequiredFieldMissing {
                field: "client and project form data".to_string(),
            }
            .into());
        };

        let project = self.submit(client, project, &files, uploader_id).await?;
        self.clear_form();
        Ok(project)
    }

    // === Form ===

    pub fn set_form(&self, client: ClientRecord, project: NewProject, files: ProjectFileSlots) {
        self.form
            .send_replace(FormDraft::new(client, project, files));
    }

    pub fn update_form(&self, modify: impl FnOnce(&mut FormDraft)) {
        self.form.send_modify(modify);
    }

    pub fn clear_form(&self) {
        self.form.send_replace(FormDraft::default());
    }

    pub fn has_form_data(&self) -> bool {
        self.form.borrow().has_data()
    }

    pub fn form(&self) -> FormDraft {
        self.form.borrow().clone()
    }

    pub fn watch_form(&self) -> watch::Receiver<FormDraft> {
        self.form.subscribe()
    }

    // === Lifecycle ===

    /// A user signed in: follow their projects.
    pub async fn on_authenticated(&self, user: UserId) {
        debug!(user_id = %user, "Authenticated");
        self.projects.start_for(user).await;
    }

    /// The user signed out: release the listener.
    pub async fn on_unauthenticated(&self) {
        debug!("Unauthenticated");
        self.projects.stop().await;
    }

    /// Drive the listener from an authentication feed until its sender is
    /// dropped. A change of user stops the old listener before starting
    /// the new one.
    pub async fn follow_auth(&self, mut auth: watch::Receiver<Option<UserId>>) {
        let mut current: Option<UserId> = None;
        loop {
            let next = auth.borrow_and_update().clone();
            if next != current {
                if current.is_some() {
                    self.on_unauthenticated().await;
                }
                if let Some(user) = &next {
                    self.on_authenticated(user.clone()).await;
                }
                current = next;
            }

            if auth.changed().await.is_err() {
                break;
            }
        }
        if current.is_some() {
            self.on_unauthenticated().await;
        }
    }

    /// Stop the listener and clear the cache, form, and all observable state.
    pub async fn reset(&self) {
        self.projects.reset().await;
        self.clients.clear();
        self.clear_form();
        self.submissions.reset();
        info!("Project store reset");
    }
}
