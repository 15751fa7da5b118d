//! Submission workflow tests
//!
//! Runs the full client → project → files sequence against recording
//! in-memory adapters and checks call order, stored records, observable
//! state, and failure handling.

mod support;

use helio_test_utils::{
    assertions, fixtures, AdapterCall, ClientRecord, Collection, EntityStoreExt, ErrorKind,
    FileType, FileUpload, Harness, IntakeConfig, NewProject, ProjectFileSlots, SubmitStep, UserId,
};
use support::{project_store, project_store_with};

fn fail_contract_upload(harness: &Harness) {
    harness
        .blobs
        .fail_when(|c| matches!(c, AdapterCall::Put(_)) && c.is_for_slot(FileType::Contract));
}

#[tokio::test]
async fn test_submit_writes_client_through_to_cache() {
    let harness = Harness::signed_in("user-1");
    let store = project_store(&harness);

    let project = store
        .submit(
            fixtures::client(),
            fixtures::project_draft(),
            &ProjectFileSlots::default(),
            None,
        )
        .await
        .unwrap();

    let client_id = store.submissions().last_submitted_client_id().unwrap();
    assert_eq!(project.client_id, client_id);

    harness.log.clear();
    assert_eq!(store.get_cached_client(client_id), Some(fixtures::client()));
    assert_eq!(store.get_or_load_client(client_id).await, Some(fixtures::client()));
    assert!(harness.log.calls().is_empty());
}

#[tokio::test]
async fn test_all_slots_run_in_fixed_order() {
    let harness = Harness::signed_in("user-1");
    let store = project_store(&harness);

    let project = store
        .submit(
            fixtures::client(),
            fixtures::project_draft(),
            &fixtures::all_slots(),
            None,
        )
        .await
        .unwrap();

    let mut expected = vec![
        AdapterCall::Create(Collection::Clients),
        AdapterCall::Create(Collection::Projects),
    ];
    for slot in FileType::ALL {
        let marker = format!("projects/{}/{}_", project.id, slot.as_str());
        expected.push(AdapterCall::Put(marker.clone()));
        expected.push(AdapterCall::DownloadUrl(marker));
        expected.push(AdapterCall::Create(Collection::Files));
    }
    assertions::assert_call_order(&harness.log.calls(), &expected);

    let files = harness
        .entity_store()
        .file_list_by_project(project.id)
        .await
        .unwrap();
    assert_eq!(files.len(), 4);
    for file in &files {
        assert_eq!(file.metadata.project_id, project.id);
        assert_eq!(file.metadata.version, 1);
        assert_eq!(file.metadata.uploaded_by, UserId::new("user-1"));
        assert_eq!(file.metadata.mime_type, "application/pdf");
    }
}

#[tokio::test]
async fn test_project_is_stamped_with_client_and_owner() {
    let harness = Harness::signed_in("user-1");
    let store = project_store(&harness);

    let project = store
        .submit(
            fixtures::client(),
            fixtures::project_draft(),
            &ProjectFileSlots::default(),
            None,
        )
        .await
        .unwrap();

    let stored = harness
        .entity_store()
        .project_get(project.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, project);
    assert_eq!(stored.owner_user_id, UserId::new("user-1"));
    assert_eq!(stored.system.number_of_panels, Some(12));
    assert!(harness
        .entity_store()
        .client_get(stored.client_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_file_name_is_sanitized_in_storage_path() {
    let harness = Harness::signed_in("user-1");
    let store = project_store(&harness);
    let slots = ProjectFileSlots::default().with(
        FileType::SitePlan,
        FileUpload::new("plan (final)#1.pdf", b"%PDF".to_vec()),
    );

    let project = store
        .submit(fixtures::client(), fixtures::project_draft(), &slots, None)
        .await
        .unwrap();

    let files = harness
        .entity_store()
        .file_list_by_project(project.id)
        .await
        .unwrap();
    assert_eq!(files.len(), 1);
    let meta = &files[0].metadata;

    let prefix = format!("projects/{}/sitePlan_", project.id);
    assert!(meta.storage_path.starts_with(&prefix), "{}", meta.storage_path);
    let rest = &meta.storage_path[prefix.len()..];
    let (millis, safe_name) = rest.split_once('_').unwrap();
    assert!(millis.parse::<i64>().is_ok());
    assert_eq!(safe_name, "plan__final__1.pdf");

    assert_eq!(meta.name, "plan (final)#1.pdf");
    assert_eq!(meta.mime_type, "application/octet-stream");
    assert_eq!(meta.size, 4);

    let blob = harness.blob_store().object(&meta.storage_path).unwrap();
    assert_eq!(blob.bytes, b"%PDF");
    assert!(meta.download_url.starts_with("memory://blobs/"));
}

#[tokio::test]
async fn test_only_filled_slots_are_uploaded() {
    let harness = Harness::signed_in("user-1");
    let store = project_store(&harness);

    let project = store
        .submit(
            fixtures::client(),
            fixtures::project_draft(),
            &fixtures::sparse_slots(),
            None,
        )
        .await
        .unwrap();

    let puts: Vec<AdapterCall> = harness
        .log
        .calls()
        .into_iter()
        .filter(|c| matches!(c, AdapterCall::Put(_)))
        .collect();
    assert_eq!(puts.len(), 2);
    assert!(puts[0].is_for_slot(FileType::SitePlan));
    assert!(puts[1].is_for_slot(FileType::Other));

    let mut types: Vec<FileType> = harness
        .entity_store()
        .file_list_by_project(project.id)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.metadata.file_type)
        .collect();
    types.sort();
    assert_eq!(types, vec![FileType::SitePlan, FileType::Other]);
}

#[tokio::test]
async fn test_partial_failure_keeps_prior_writes() {
    let harness = Harness::signed_in("user-1");
    let store = project_store(&harness);
    fail_contract_upload(&harness);

    let result = store
        .submit(
            fixtures::client(),
            fixtures::project_draft(),
            &fixtures::all_slots(),
            None,
        )
        .await;

    // client, project, then blob + record for sitePlan and permit
    assertions::assert_partial_at(&result, SubmitStep::UploadFile(FileType::Contract), 6);
    assertions::assert_kind(&result, ErrorKind::PartialSubmission);

    let entities = harness.entity_store();
    assert_eq!(entities.count(Collection::Clients), 1);
    assert_eq!(entities.count(Collection::Projects), 1);
    assert_eq!(entities.count(Collection::Files), 2);
    assert_eq!(harness.blob_store().len(), 2);

    let project = entities
        .project_list_by_owner(&UserId::new("user-1"))
        .await
        .unwrap()
        .remove(0);
    let contracts = entities
        .file_list_by_project_and_type(project.id, FileType::Contract)
        .await
        .unwrap();
    assert!(contracts.is_empty());
    let plans = entities
        .file_list_by_project_and_type(project.id, FileType::SitePlan)
        .await
        .unwrap();
    assert_eq!(plans.len(), 1);

    // Nothing runs after the failing upload.
    let last = harness.log.calls().pop().unwrap();
    assert!(matches!(last, AdapterCall::Put(_)) && last.is_for_slot(FileType::Contract));

    let state = store.submissions().state();
    assert!(!state.submitting);
    assert!(state.error.unwrap().contains("upload contract"));
    assert!(state.current_project.is_none());
    assert!(state.last_submitted_client_id.is_some());
}

#[tokio::test]
async fn test_compensation_removes_partial_writes() {
    let harness = Harness::signed_in("user-1");
    let store = project_store_with(&harness, IntakeConfig::default().with_compensation(true));
    fail_contract_upload(&harness);

    let result = store
        .submit(
            fixtures::client(),
            fixtures::project_draft(),
            &fixtures::all_slots(),
            None,
        )
        .await;
    assertions::assert_partial_at(&result, SubmitStep::UploadFile(FileType::Contract), 6);

    let entities = harness.entity_store();
    assert_eq!(entities.count(Collection::Clients), 0);
    assert_eq!(entities.count(Collection::Projects), 0);
    assert_eq!(entities.count(Collection::Files), 0);
    assert!(harness.blob_store().is_empty());

    assert!(store.clients().snapshot().is_empty());
    assert!(store.submissions().last_submitted_client_id().is_none());
}

#[tokio::test]
async fn test_client_left_behind_stays_last_submitted() {
    let harness = Harness::signed_in("user-1");
    let store = project_store_with(&harness, IntakeConfig::default().with_compensation(true));
    fail_contract_upload(&harness);
    harness
        .entities
        .fail_when(|c| *c == AdapterCall::Delete(Collection::Clients));

    let result = store
        .submit(
            fixtures::client(),
            fixtures::project_draft(),
            &fixtures::all_slots(),
            None,
        )
        .await;
    assertions::assert_partial_at(&result, SubmitStep::UploadFile(FileType::Contract), 6);

    assert_eq!(harness.entity_store().count(Collection::Clients), 1);
    assert_eq!(harness.entity_store().count(Collection::Projects), 0);
    let client_id = store.submissions().last_submitted_client_id().unwrap();
    assert_eq!(store.get_cached_client(client_id), Some(fixtures::client()));
}

#[tokio::test]
async fn test_failure_before_any_write_returns_underlying_error() {
    let harness = Harness::signed_in("user-1");
    let store = project_store(&harness);
    harness
        .entities
        .fail_when(|c| *c == AdapterCall::Create(Collection::Clients));

    let result = store
        .submit(
            fixtures::client(),
            fixtures::project_draft(),
            &fixtures::all_slots(),
            None,
        )
        .await;

    assertions::assert_kind(&result, ErrorKind::AdapterFailure);
    assert!(store.submissions().last_submitted_client_id().is_none());
    assert!(store.submissions().state().error.is_some());
    assert_eq!(harness.log.calls(), vec![AdapterCall::Create(Collection::Clients)]);
}

#[tokio::test]
async fn test_invalid_drafts_commit_nothing() {
    let harness = Harness::signed_in("user-1");
    let store = project_store(&harness);

    let result = store
        .submit(
            ClientRecord::new("", "ana@example.com"),
            fixtures::project_draft(),
            &fixtures::all_slots(),
            None,
        )
        .await;
    assertions::assert_kind(&result, ErrorKind::Invalid);

    let result = store
        .submit(
            fixtures::client(),
            NewProject::new("   "),
            &ProjectFileSlots::default(),
            None,
        )
        .await;
    assertions::assert_kind(&result, ErrorKind::Invalid);

    assert!(harness.log.calls().is_empty());
    assert!(store.submissions().state().error.is_some());
}

#[tokio::test]
async fn test_identity_resolution_order() {
    // Explicit uploader wins over the signed-in user.
    let harness = Harness::signed_in("user-1");
    let store = project_store(&harness);
    let project = store
        .submit(
            fixtures::client(),
            fixtures::project_draft(),
            &ProjectFileSlots::default(),
            Some(UserId::new("installer-7")),
        )
        .await
        .unwrap();
    assert_eq!(project.owner_user_id, UserId::new("installer-7"));

    // Nobody signed in falls back to the sentinel.
    let harness = Harness::new();
    let store = project_store(&harness);
    let project = store
        .submit(
            fixtures::client(),
            fixtures::project_draft(),
            &fixtures::sparse_slots(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(project.owner_user_id, UserId::new("unknown"));

    let files = harness
        .entity_store()
        .file_list_by_project(project.id)
        .await
        .unwrap();
    assert!(files
        .iter()
        .all(|f| f.metadata.uploaded_by == UserId::new("unknown")));

    // An empty uploader id falls through to the signed-in user.
    let harness = Harness::signed_in("user-1");
    let store = project_store(&harness);
    let project = store
        .submit(
            fixtures::client(),
            fixtures::project_draft(),
            &ProjectFileSlots::default(),
            Some(UserId::new("")),
        )
        .await
        .unwrap();
    assert_eq!(project.owner_user_id, UserId::new("user-1"));
    let owned = harness
        .entity_store()
        .project_list_by_owner(&UserId::new("user-1"))
        .await
        .unwrap();
    assert_eq!(owned.len(), 1);

    // An empty signed-in id falls through to the sentinel.
    let harness = Harness::signed_in("");
    let store = project_store(&harness);
    assert_eq!(
        store.submissions().resolve_identity(Some(UserId::new(""))),
        UserId::new("unknown")
    );
}

#[tokio::test]
async fn test_email_format_is_not_checked() {
    let harness = Harness::signed_in("user-1");
    let store = project_store(&harness);

    let project = store
        .submit(
            ClientRecord::new("Ana", "ana at example dot com"),
            fixtures::project_draft(),
            &ProjectFileSlots::default(),
            None,
        )
        .await
        .unwrap();

    let client = harness
        .entity_store()
        .client_get(project.client_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(client.email, "ana at example dot com");
}

#[tokio::test]
async fn test_success_clears_previous_error_and_sets_current_project() {
    let harness = Harness::signed_in("user-1");
    let store = project_store(&harness);
    fail_contract_upload(&harness);

    let failed = store
        .submit(
            fixtures::client(),
            fixtures::project_draft(),
            &fixtures::all_slots(),
            None,
        )
        .await;
    assert!(failed.is_err());
    assert!(store.submissions().state().error.is_some());

    harness.blobs.heal();
    let project = store
        .submit(
            fixtures::client(),
            fixtures::project_draft(),
            &fixtures::all_slots(),
            None,
        )
        .await
        .unwrap();

    let state = store.submissions().state();
    assert!(state.error.is_none());
    assert!(!state.submitting);
    assert_eq!(state.current_project, Some(project));
}

#[tokio::test]
async fn test_submit_form_clears_draft_on_success() {
    let harness = Harness::signed_in("user-1");
    let store = project_store(&harness);

    let empty = store.submit_form(None).await;
    assertions::assert_kind(&empty, ErrorKind::Invalid);

    store.set_form(
        fixtures::client(),
        fixtures::project_draft(),
        fixtures::sparse_slots(),
    );
    assert!(store.has_form_data());

    let project = store.submit_form(None).await.unwrap();
    assert!(!store.has_form_data());
    assert_eq!(
        harness
            .entity_store()
            .file_list_by_project(project.id)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_failed_form_submission_keeps_draft() {
    let harness = Harness::signed_in("user-1");
    let store = project_store(&harness);
    fail_contract_upload(&harness);

    store.set_form(
        fixtures::client(),
        fixtures::project_draft(),
        fixtures::all_slots(),
    );
    assert!(store.submit_form(None).await.is_err());
    assert!(store.has_form_data());

    store.clear_form();
    assert!(!store.has_form_data());
}
