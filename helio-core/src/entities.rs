//! Core record structures

use crate::{
    ClientId, FileId, FileType, ProjectId, ProjectStatus, Timestamp, UserId, ValidationError,
};
use serde::{Deserialize, Serialize};

/// Client - the customer a project is built for.
/// Stored in the `clients` collection; the document id is the `ClientId`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    #[serde(rename = "clientName")]
    pub name: String,
    #[serde(rename = "clientEmail")]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    /// National taxpayer id (CPF in the original deployment).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
}

impl ClientRecord {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    /// Check the fields a client cannot be stored without.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "clientName".to_string(),
            });
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "clientEmail".to_string(),
            });
        }
        Ok(())
    }
}

/// Equipment and sizing details shared by drafts and stored projects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverter_brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverter_power: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_inverters: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_power: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_panels: Option<u32>,
    #[serde(default, rename = "systemSizeKW", skip_serializing_if = "Option::is_none")]
    pub system_size_kw: Option<f64>,
}

/// Project draft as collected by the intake form, before it is stored.
///
/// `client_id` and `owner_user_id` are stamped during submission; whatever
/// the caller put there is overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    #[serde(rename = "projectName")]
    pub name: String,
    #[serde(rename = "projectDesc", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<UserId>,
    #[serde(flatten)]
    pub system: SystemSpec,
    #[serde(default)]
    pub status: ProjectStatus,
}

impl NewProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            client_id: None,
            owner_user_id: None,
            system: SystemSpec::default(),
            status: ProjectStatus::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "projectName".to_string(),
            });
        }
        Ok(())
    }
}

/// Project - a stored installation project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: ProjectId,
    #[serde(rename = "projectName")]
    pub name: String,
    #[serde(rename = "projectDesc", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub client_id: ClientId,
    #[serde(rename = "userId")]
    pub owner_user_id: UserId,
    #[serde(flatten)]
    pub system: SystemSpec,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub status: ProjectStatus,
}

/// Partial update for a stored project. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    #[serde(rename = "projectName", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "projectDesc", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

/// Partial update for a stored client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientUpdate {
    #[serde(rename = "clientName", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "clientEmail", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// File metadata - one uploaded document attached to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadataRecord {
    pub project_id: ProjectId,
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// Original file name as provided by the uploader.
    pub name: String,
    pub storage_path: String,
    pub download_url: String,
    pub mime_type: String,
    pub size: u64,
    pub uploaded_by: UserId,
    pub uploaded_at: Timestamp,
    pub version: u32,
}

/// A stored file metadata record together with its document id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: FileId,
    #[serde(flatten)]
    pub metadata: FileMetadataRecord,
}

/// Partial update for a file metadata record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

/// A raw binary picked in the form, not yet uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// The four named upload slots of the intake form. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFileSlots {
    pub site_plan: Option<FileUpload>,
    pub permit: Option<FileUpload>,
    pub contract: Option<FileUpload>,
    pub other: Option<FileUpload>,
}

impl ProjectFileSlots {
    pub fn get(&self, slot: FileType) -> Option<&FileUpload> {
        match slot {
            FileType::SitePlan => self.site_plan.as_ref(),
            FileType::Permit => self.permit.as_ref(),
            FileType::Contract => self.contract.as_ref(),
            FileType::Other => self.other.as_ref(),
        }
    }

    pub fn set(&mut self, slot: FileType, file: Option<FileUpload>) {
        let target = match slot {
            FileType::SitePlan => &mut self.site_plan,
            FileType::Permit => &mut self.permit,
            FileType::Contract => &mut self.contract,
            FileType::Other => &mut self.other,
        };
        *target = file;
    }

    pub fn with(mut self, slot: FileType, file: FileUpload) -> Self {
        self.set(slot, Some(file));
        self
    }

    /// Occupied slots in upload order.
    pub fn filled(&self) -> impl Iterator<Item = (FileType, &FileUpload)> {
        FileType::ALL
            .into_iter()
            .filter_map(move |slot| self.get(slot).map(|file| (slot, file)))
    }

    pub fn is_empty(&self) -> bool {
        self.filled().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityIdType;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_client_wire_names() {
        let mut client = ClientRecord::new("Ana Souza", "ana@example.com");
        client.tax_id = Some("123".to_string());
        let value = serde_json::to_value(&client).unwrap();
        assert_eq!(value["clientName"], json!("Ana Souza"));
        assert_eq!(value["clientEmail"], json!("ana@example.com"));
        assert_eq!(value["taxId"], json!("123"));
        assert!(value.get("phone").is_none());
    }

    #[test]
    fn test_client_validation() {
        assert!(ClientRecord::new("Ana", "ana@example.com").validate().is_ok());
        assert!(matches!(
            ClientRecord::new(" ", "ana@example.com").validate(),
            Err(ValidationError::RequiredFieldMissing { .. })
        ));
        assert!(matches!(
            ClientRecord::new("Ana", "   ").validate(),
            Err(ValidationError::RequiredFieldMissing { .. })
        ));
        // Email format is not checked, only presence.
        assert!(ClientRecord::new("Ana", "ana at example dot com")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_project_flattens_system_spec() {
        let now = Utc::now();
        let project = ProjectRecord {
            id: ProjectId::now_v7(),
            name: "Roof array".to_string(),
            description: None,
            client_id: ClientId::now_v7(),
            owner_user_id: UserId::from("uid-1"),
            system: SystemSpec {
                number_of_panels: Some(12),
                system_size_kw: Some(6.6),
                ..Default::default()
            },
            created_at: now,
            updated_at: now,
            status: ProjectStatus::Planning,
        };
        let value = serde_json::to_value(&project).unwrap();
        assert_eq!(value["numberOfPanels"], json!(12));
        assert_eq!(value["systemSizeKW"], json!(6.6));
        assert_eq!(value["userId"], json!("uid-1"));

        let back: ProjectRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, project);
    }

    #[test]
    fn test_file_slots_filled_in_fixed_order() {
        let slots = ProjectFileSlots::default()
            .with(FileType::Other, FileUpload::new("b.txt", b"b".to_vec()))
            .with(FileType::SitePlan, FileUpload::new("a.pdf", b"a".to_vec()));

        let order: Vec<FileType> = slots.filled().map(|(slot, _)| slot).collect();
        assert_eq!(order, vec![FileType::SitePlan, FileType::Other]);
        assert!(!slots.is_empty());
        assert!(ProjectFileSlots::default().is_empty());
    }
}
