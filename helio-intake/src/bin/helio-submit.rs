//! HELIO intake submission tool.
//!
//! Reads a JSON manifest describing a client, a project, and the files for
//! each upload slot, submits it into in-memory stores, and prints the stored
//! project and file records as JSON.
//!
//! ```text
//! helio-submit manifest.json
//! ```
//!
//! Manifest layout:
//!
//! ```json
//! {
//!   "client": { "clientName": "Ana", "clientEmail": "ana@example.com" },
//!   "project": { "projectName": "Roof array" },
//!   "files": { "sitePlan": { "path": "plan.pdf", "contentType": "application/pdf" } },
//!   "uploader": "user-1"
//! }
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use helio_core::{
    ClientRecord, FileType, FileUpload, HelioError, IntakeConfig, NewProject, ProjectFileSlots,
    ProjectRecord, StoredFile, UserId,
};
use helio_intake::{Adapters, ProjectStore};
use helio_storage::{EntityStoreExt, InMemoryBlobStore, InMemoryEntityStore, SessionIdentity};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
enum CliError {
    #[error("usage: helio-submit <manifest.json>")]
    Usage,

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error(transparent)]
    Helio(#[from] HelioError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    client: ClientRecord,
    project: NewProject,
    #[serde(default)]
    files: ManifestFiles,
    #[serde(default)]
    uploader: Option<UserId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestFiles {
    site_plan: Option<ManifestFile>,
    permit: Option<ManifestFile>,
    contract: Option<ManifestFile>,
    other: Option<ManifestFile>,
}

impl ManifestFiles {
    fn slots(&self) -> [(FileType, Option<&ManifestFile>); 4] {
        [
            (FileType::SitePlan, self.site_plan.as_ref()),
            (FileType::Permit, self.permit.as_ref()),
            (FileType::Contract, self.contract.as_ref()),
            (FileType::Other, self.other.as_ref()),
        ]
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestFile {
    path: PathBuf,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct Output {
    project: ProjectRecord,
    files: Vec<StoredFile>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so stdout carries only the JSON result.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    match run().await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Submission failed");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<String, CliError> {
    let manifest_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .ok_or(CliError::Usage)?;
    let manifest: Manifest = serde_json::from_slice(&read(&manifest_path)?)?;
    let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));

    let mut slots = ProjectFileSlots::default();
    for (slot, file) in manifest.files.slots() {
        let Some(file) = file else { continue };
        let path = base_dir.join(&file.path);
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.path.to_string_lossy().into_owned());
        let mut upload = FileUpload::new(name, read(&path)?);
        if let Some(content_type) = &file.content_type {
            upload = upload.with_content_type(content_type.clone());
        }
        slots.set(slot, Some(upload));
    }

    let entities = Arc::new(InMemoryEntityStore::new());
    let blobs = Arc::new(InMemoryBlobStore::default());
    let identity = Arc::new(SessionIdentity::anonymous());
    let store = ProjectStore::init(
        Adapters::new(entities.clone(), blobs, identity),
        IntakeConfig::from_env(),
    )?;

    let project = store
        .submit(manifest.client, manifest.project, &slots, manifest.uploader)
        .await?;
    let files = entities.file_list_by_project(project.id).await?;

    Ok(serde_json::to_string_pretty(&Output { project, files })?)
}

fn read(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}
