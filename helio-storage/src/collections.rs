//! Typed per-collection operations over an [`EntityStore`].
//!
//! These are thin: serialize, call the store, decode. Every method is
//! available on any `EntityStore` through the blanket impl.

use crate::adapters::{Document, EntityStore, SnapshotCallback, Subscription};
use ::async_trait::async_trait;
use helio_core::{
    ClientId, ClientRecord, ClientUpdate, Collection, EntityIdType, FileId, FileMetadataRecord,
    FileType, FileUpdate, Filter, FilterExpr, HelioResult, NewProject, ProjectId, ProjectRecord,
    ProjectUpdate, StorageError, StoredFile, UserId, ValidationError,
};
use serde::Serialize;
use serde_json::{json, Value};

fn to_body<T: Serialize>(collection: Collection, record: &T) -> HelioResult<Value> {
    serde_json::to_value(record).map_err(|e| {
        StorageError::Serialization {
            collection,
            reason: e.to_string(),
        }
        .into()
    })
}

fn decode_all<T: serde::de::DeserializeOwned>(
    collection: Collection,
    documents: Vec<Document>,
) -> HelioResult<Vec<T>> {
    documents
        .iter()
        .map(|doc| doc.decode(collection))
        .collect()
}

/// Decode a pushed project snapshot. Malformed documents are returned as
/// errors alongside the records that decoded cleanly.
pub fn decode_projects(documents: Vec<Document>) -> (Vec<ProjectRecord>, Vec<StorageError>) {
    let mut projects = Vec::with_capacity(documents.len());
    let mut errors = Vec::new();
    for doc in &documents {
        match doc.decode::<ProjectRecord>(Collection::Projects) {
            Ok(project) => projects.push(project),
            Err(helio_core::HelioError::Storage(e)) => errors.push(e),
            Err(other) => errors.push(StorageError::Serialization {
                collection: Collection::Projects,
                reason: other.to_string(),
            }),
        }
    }
    (projects, errors)
}

/// Typed operations on the `clients`, `projects`, and `files` collections.
#[async_trait]
pub trait EntityStoreExt: EntityStore {
    // === Client Operations ===

    /// Create a client and return its id.
    async fn client_create(&self, client: &ClientRecord) -> HelioResult<ClientId> {
        let body = to_body(Collection::Clients, client)?;
        let id = self.create(Collection::Clients, body).await?;
        Ok(ClientId::new(id))
    }

    /// Get a client by id.
    async fn client_get(&self, id: ClientId) -> HelioResult<Option<ClientRecord>> {
        match self.get(Collection::Clients, id.as_uuid()).await? {
            Some(doc) => Ok(Some(doc.decode(Collection::Clients)?)),
            None => Ok(None),
        }
    }

    async fn client_update(&self, id: ClientId, update: &ClientUpdate) -> HelioResult<()> {
        let body = to_body(Collection::Clients, update)?;
        self.update(Collection::Clients, id.as_uuid(), body).await
    }

    async fn client_delete(&self, id: ClientId) -> HelioResult<()> {
        self.delete(Collection::Clients, id.as_uuid()).await
    }

    /// List clients registered under an email address.
    async fn client_list_by_email(&self, email: &str) -> HelioResult<Vec<(ClientId, ClientRecord)>> {
        let docs = self
            .query(Collection::Clients, &Filter::where_eq("clientEmail", email))
            .await?;
        let mut clients = Vec::with_capacity(docs.len());
        for doc in &docs {
            clients.push((ClientId::new(doc.id), doc.decode(Collection::Clients)?));
        }
        Ok(clients)
    }

    // === Project Operations ===

    /// Create a project from a draft. The draft must already carry its
    /// client and owner; timestamps come from the store.
    async fn project_create(&self, draft: &NewProject) -> HelioResult<ProjectRecord> {
        let client_id = draft.client_id.ok_or_else(|| ValidationError::RequiredFieldMissing {
            field: "clientId".to_string(),
        })?;
        let owner_user_id = draft.owner_user_id.clone().ok_or_else(|| {
            ValidationError::RequiredFieldMissing {
                field: "userId".to_string(),
            }
        })?;

        let now = self.server_timestamp();
        let mut body = to_body(Collection::Projects, draft)?;
        if let Value::Object(map) = &mut body {
            map.insert("createdAt".to_string(), json!(now));
            map.insert("updatedAt".to_string(), json!(now));
        }
        let id = self.create(Collection::Projects, body).await?;

        Ok(ProjectRecord {
            id: ProjectId::new(id),
            name: draft.name.clone(),
            description: draft.description.clone(),
            client_id,
            owner_user_id,
            system: draft.system.clone(),
            created_at: now,
            updated_at: now,
            status: draft.status,
        })
    }

    async fn project_get(&self, id: ProjectId) -> HelioResult<Option<ProjectRecord>> {
        match self.get(Collection::Projects, id.as_uuid()).await? {
            Some(doc) => Ok(Some(doc.decode(Collection::Projects)?)),
            None => Ok(None),
        }
    }

    /// Apply a partial update. `updatedAt` is refreshed unless given.
    async fn project_update(&self, id: ProjectId, update: &ProjectUpdate) -> HelioResult<()> {
        let mut update = update.clone();
        if update.updated_at.is_none() {
            update.updated_at = Some(self.server_timestamp());
        }
        let body = to_body(Collection::Projects, &update)?;
        self.update(Collection::Projects, id.as_uuid(), body).await
    }

    async fn project_delete(&self, id: ProjectId) -> HelioResult<()> {
        self.delete(Collection::Projects, id.as_uuid()).await
    }

    /// All projects owned by a user.
    async fn project_list_by_owner(&self, owner: &UserId) -> HelioResult<Vec<ProjectRecord>> {
        let docs = self
            .query(Collection::Projects, &owner_filter(owner))
            .await?;
        decode_all(Collection::Projects, docs)
    }

    /// Continuous query over a user's projects.
    async fn project_subscribe_by_owner(
        &self,
        owner: &UserId,
        on_snapshot: SnapshotCallback,
    ) -> HelioResult<Subscription> {
        self.subscribe(Collection::Projects, owner_filter(owner), on_snapshot)
            .await
    }

    // === File Metadata Operations ===

    async fn file_create(&self, file: &FileMetadataRecord) -> HelioResult<FileId> {
        let body = to_body(Collection::Files, file)?;
        let id = self.create(Collection::Files, body).await?;
        Ok(FileId::new(id))
    }

    async fn file_get(&self, id: FileId) -> HelioResult<Option<FileMetadataRecord>> {
        match self.get(Collection::Files, id.as_uuid()).await? {
            Some(doc) => Ok(Some(doc.decode(Collection::Files)?)),
            None => Ok(None),
        }
    }

    async fn file_update(&self, id: FileId, update: &FileUpdate) -> HelioResult<()> {
        let body = to_body(Collection::Files, update)?;
        self.update(Collection::Files, id.as_uuid(), body).await
    }

    async fn file_delete(&self, id: FileId) -> HelioResult<()> {
        self.delete(Collection::Files, id.as_uuid()).await
    }

    /// All file records attached to a project.
    async fn file_list_by_project(&self, project_id: ProjectId) -> HelioResult<Vec<StoredFile>> {
        let docs = self
            .query(
                Collection::Files,
                &Filter::where_eq("projectId", project_id.to_string()),
            )
            .await?;
        decode_all(Collection::Files, docs)
    }

    /// File records of one slot type attached to a project.
    async fn file_list_by_project_and_type(
        &self,
        project_id: ProjectId,
        file_type: FileType,
    ) -> HelioResult<Vec<StoredFile>> {
        let filter = Filter::where_eq("projectId", project_id.to_string())
            .and(FilterExpr::eq("type", file_type.as_str()));
        let docs = self.query(Collection::Files, &filter).await?;
        decode_all(Collection::Files, docs)
    }
}

impl<S: EntityStore + ?Sized> EntityStoreExt for S {}

fn owner_filter(owner: &UserId) -> Filter {
    Filter::where_eq("userId", owner.as_str())
}
