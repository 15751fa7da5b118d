//! Live subscription to the signed-in user's projects.
//!
//! The manager is either stopped or listening. While listening it holds
//! exactly one open subscription; every snapshot the store pushes replaces
//! the project list in full.

use std::sync::Arc;

use helio_core::{AuthError, ProjectRecord, UserId};
use helio_storage::{
    decode_projects, Document, EntityStore, EntityStoreExt, IdentityProvider, SnapshotCallback,
    Subscription,
};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// Observable state of [`LiveProjects`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectListState {
    /// Latest project list for the identity being followed.
    pub projects: Vec<ProjectRecord>,
    /// True from `start` until the first snapshot arrives.
    pub loading: bool,
    /// Message from the last failed start or fetch.
    pub error: Option<String>,
    /// True while a subscription is open.
    pub listening: bool,
}

/// Live project list for one identity at a time.
pub struct LiveProjects {
    entities: Arc<dyn EntityStore>,
    identity: Arc<dyn IdentityProvider>,
    state: Arc<watch::Sender<ProjectListState>>,
    subscription: Mutex<Option<Subscription>>,
}

impl LiveProjects {
    pub fn new(entities: Arc<dyn EntityStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(ProjectListState::default());
        Self {
            entities,
            identity,
            state: Arc::new(state),
            subscription: Mutex::new(None),
        }
    }

    /// Start listening for the signed-in user. No-op while listening.
    ///
    /// With nobody signed in this records `"No user logged in"` and stays
    /// stopped.
    pub async fn start(&self) {
        let mut slot = self.subscription.lock().await;
        if slot.is_some() {
            debug!("Project listener already running");
            return;
        }

        match self.identity.current_identity() {
            Some(user) => self.open(&mut slot, user).await,
            None => self.record_unauthenticated(),
        }
    }

    /// Start listening for an explicit identity. No-op while listening.
    pub async fn start_for(&self, user: UserId) {
        let mut slot = self.subscription.lock().await;
        if slot.is_some() {
            debug!(user_id = %user, "Project listener already running");
            return;
        }
        self.open(&mut slot, user).await;
    }

    /// Release the subscription. No-op when stopped.
    pub async fn stop(&self) {
        let released = self.subscription.lock().await.take();
        if let Some(subscription) = released {
            subscription.unsubscribe();
            self.state.send_modify(|s| {
                s.listening = false;
                s.loading = false;
            });
            info!("Project listener stopped");
        }
    }

    /// Fetch the signed-in user's projects once.
    ///
    /// Skipped when the list is already populated. Failures are recorded in
    /// [`ProjectListState::error`] and leave the list untouched.
    pub async fn fetch_once(&self) -> Vec<ProjectRecord> {
        {
            let state = self.state.borrow();
            if !state.projects.is_empty() {
                return state.projects.clone();
            }
        }

        let Some(user) = self.identity.current_identity() else {
            self.record_unauthenticated();
            return Vec::new();
        };

        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        match self.entities.project_list_by_owner(&user).await {
            Ok(projects) => {
                debug!(user_id = %user, count = projects.len(), "Fetched projects");
                self.state.send_modify(|s| {
                    s.projects = projects.clone();
                    s.loading = false;
                });
                projects
            }
            Err(e) => {
                warn!(user_id = %user, error = %e, "Project fetch failed");
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(e.to_string());
                });
                Vec::new()
            }
        }
    }

    pub fn is_listening(&self) -> bool {
        self.state.borrow().listening
    }

    pub fn projects(&self) -> Vec<ProjectRecord> {
        self.state.borrow().projects.clone()
    }

    pub fn state(&self) -> ProjectListState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<ProjectListState> {
        self.state.subscribe()
    }

    /// Stop listening and forget the list and any error.
    pub async fn reset(&self) {
        self.stop().await;
        self.state.send_replace(ProjectListState::default());
    }

    async fn open(&self, slot: &mut Option<Subscription>, user: UserId) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let state = Arc::clone(&self.state);
        let on_snapshot: SnapshotCallback = Arc::new(move |docs: Vec<Document>| {
            let (projects, malformed) = decode_projects(docs);
            for e in &malformed {
                warn!(error = %e, "Skipping malformed project document");
            }
            debug!(count = projects.len(), "Project snapshot received");
            state.send_modify(|s| {
                s.projects = projects;
                s.loading = false;
            });
        });

        match self
            .entities
            .project_subscribe_by_owner(&user, on_snapshot)
            .await
        {
            Ok(subscription) => {
                *slot = Some(subscription);
                self.state.send_modify(|s| s.listening = true);
                info!(user_id = %user, "Project listener started");
            }
            Err(e) => {
                warn!(user_id = %user, error = %e, "Project listener failed to start");
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(e.to_string());
                });
            }
        }
    }

    fn record_unauthenticated(&self) {
        warn!("Project listener needs a signed-in user");
        self.state
            .send_modify(|s| s.error = Some(AuthError::NotAuthenticated.to_string()));
    }
}
