use std::collections::HashSet;
use std::sync::Arc;

use campus_core::constants::MIB;
use campus_core::{FileHandle, PathParams, TargetKind, UploadTarget};
use campus_storage::{
    FailureKind, ListOptions, MemoryStorage, ObjectStorage, StorageError,
};
use campus_upload::{
    ProgressReporter, Rejection, UploadService, UploadSettings, UploadState,
};

fn setup() -> (Arc<MemoryStorage>, UploadService) {
    let storage = Arc::new(MemoryStorage::new().with_base_url("https://files.test"));
    let service = UploadService::new(storage.clone(), UploadSettings::default());
    (storage, service)
}

fn jpeg_target() -> UploadTarget {
    UploadTarget::for_kind(TargetKind::CourseImage)
        .with_max_size(5 * MIB)
        .with_mime_types(["image/jpeg"])
}

fn jpeg(size: u64) -> FileHandle {
    FileHandle::with_declared_size("photo.jpg", "image/jpeg", size, vec![0xFF, 0xD8, 0xFF])
}

#[tokio::test]
async fn scenario_a_accepted_jpeg_succeeds_with_url() {
    let (storage, service) = setup();
    let mut session = service
        .select(jpeg(3 * MIB), jpeg_target(), PathParams::course("10"))
        .unwrap();

    let state = service
        .upload(&mut session, &ProgressReporter::default())
        .await
        .unwrap();

    let outcome = match state {
        UploadState::Succeeded(outcome) => outcome,
        other => panic!("expected success, got {:?}", other),
    };
    assert!(!outcome.url.is_empty());
    assert!(outcome.path.starts_with("courses/10/photo-"));
    assert!(storage.contains("course-images", &outcome.path).await);
}

#[tokio::test]
async fn scenario_b_oversized_jpeg_is_rejected_without_key() {
    let (storage, service) = setup();
    let session = service
        .select(jpeg(6 * MIB), jpeg_target(), PathParams::course("10"))
        .unwrap();

    match session.state() {
        UploadState::Rejected(rejection) => {
            assert!(matches!(rejection, Rejection::TooLarge { .. }));
            assert!(rejection.to_string().contains("exceeds maximum size"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert!(session.storage_key().is_none());
    assert_eq!(storage.upload_calls(), 0);
}

#[tokio::test]
async fn scenario_c_pdf_avatar_is_rejected() {
    let (storage, service) = setup();
    let session = service
        .select(
            FileHandle::new("resume.pdf", "application/pdf", vec![1, 2, 3]),
            UploadTarget::for_kind(TargetKind::Avatar)
                .with_mime_types(["image/jpeg", "image/png"]),
            PathParams::user("u-1"),
        )
        .unwrap();

    let rejection = session.rejection().expect("rejected");
    assert!(rejection.to_string().contains("type not allowed"));
    assert!(session.storage_key().is_none());
    assert_eq!(storage.upload_calls(), 0);
    assert_eq!(storage.remove_calls(), 0);
}

#[tokio::test]
async fn scenario_d_storage_error_fails_session_and_keeps_preview() {
    let (storage, service) = setup();
    storage
        .fail_next_upload(StorageError::from_service_response(
            413,
            "Payload too large",
            "The object exceeded the maximum allowed size",
        ))
        .await;

    let progress = ProgressReporter::default();
    let mut session = service
        .select(jpeg(MIB), jpeg_target(), PathParams::course("10"))
        .unwrap();
    let state = service.upload(&mut session, &progress).await.unwrap();

    match state {
        UploadState::Failed(failure) => assert_eq!(failure.kind, FailureKind::StorageQuota),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(session.preview().map(|p| p.name.as_str()), Some("photo.jpg"));
    assert!(!progress.current().visible);

    service.remove(&mut session).await;
    assert!(session.preview().is_none());
    // Nothing was stored, so nothing had to be deleted.
    assert_eq!(storage.remove_calls(), 0);
}

#[tokio::test]
async fn scenario_d_network_and_permission_failures_are_classified() {
    let (storage, service) = setup();
    storage
        .fail_next_upload(StorageError::Network("connection reset".into()))
        .await;
    storage
        .fail_next_upload(StorageError::from_service_response(
            403,
            "Unauthorized",
            "new row violates row-level security policy",
        ))
        .await;

    let progress = ProgressReporter::default();
    let mut kinds = Vec::new();
    for _ in 0..2 {
        let mut session = service
            .select(jpeg(MIB), jpeg_target(), PathParams::course("10"))
            .unwrap();
        service.upload(&mut session, &progress).await.unwrap();
        kinds.push(session.failure().map(|f| f.kind));
    }
    assert_eq!(
        kinds,
        vec![Some(FailureKind::Network), Some(FailureKind::Permission)]
    );
}

#[tokio::test]
async fn scenario_e_avatar_upload_replaces_existing_objects() {
    let (storage, service) = setup();
    storage.seed("avatars", "users/u-1/old-1.png", b"a".to_vec(), "image/png").await;
    storage.seed("avatars", "users/u-1/old-2.jpg", b"b".to_vec(), "image/jpeg").await;
    storage.seed("avatars", "users/u-2/other.png", b"c".to_vec(), "image/png").await;

    let mut session = service
        .select(
            FileHandle::new("me.png", "image/png", vec![9; 64]),
            UploadTarget::for_kind(TargetKind::Avatar),
            PathParams::user("u-1"),
        )
        .unwrap();
    service
        .upload(&mut session, &ProgressReporter::default())
        .await
        .unwrap();

    let entries = storage
        .list("avatars", "users/u-1", &ListOptions::default())
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(Some(entries[0].name.as_str()), session.object_name());
    assert!(storage.contains("avatars", "users/u-2/other.png").await);
}

#[tokio::test]
async fn avatar_pre_delete_failure_does_not_block_upload() {
    let (storage, service) = setup();
    storage.seed("avatars", "users/u-1/old.png", b"a".to_vec(), "image/png").await;
    storage.fail_removes(true);

    let mut session = service
        .select(
            FileHandle::new("me.png", "image/png", vec![9; 64]),
            UploadTarget::for_kind(TargetKind::Avatar),
            PathParams::user("u-1"),
        )
        .unwrap();
    let state = service
        .upload(&mut session, &ProgressReporter::default())
        .await
        .unwrap();

    assert!(matches!(state, UploadState::Succeeded(_)));
    assert_eq!(storage.object_count("avatars").await, 2);
}

#[tokio::test]
async fn generated_keys_are_unique_for_same_name() {
    let (_storage, service) = setup();
    let keys: HashSet<String> = (0..500)
        .map(|_| {
            service
                .select(jpeg(MIB), jpeg_target(), PathParams::course("10"))
                .unwrap()
                .storage_key()
                .map(str::to_string)
                .unwrap()
        })
        .collect();
    assert_eq!(keys.len(), 500);
}

#[tokio::test]
async fn remove_twice_is_harmless() {
    let (storage, service) = setup();
    let mut session = service
        .select(jpeg(MIB), jpeg_target(), PathParams::course("10"))
        .unwrap();
    service
        .upload(&mut session, &ProgressReporter::default())
        .await
        .unwrap();
    let path = session.outcome().unwrap().path.clone();

    service.remove(&mut session).await;
    assert!(!storage.contains("course-images", &path).await);
    assert_eq!(session.state(), &UploadState::Idle);

    service.remove(&mut session).await;
    assert_eq!(session.state(), &UploadState::Idle);
    assert!(session.storage_key().is_none());
}

#[tokio::test]
async fn remove_clears_state_even_when_delete_fails() {
    let (storage, service) = setup();
    let mut session = service
        .select(jpeg(MIB), jpeg_target(), PathParams::course("10"))
        .unwrap();
    service
        .upload(&mut session, &ProgressReporter::default())
        .await
        .unwrap();

    storage.fail_removes(true);
    service.remove(&mut session).await;
    assert_eq!(session.state(), &UploadState::Idle);
    assert!(session.preview().is_none());
    assert_eq!(storage.object_count("course-images").await, 1);
}

#[tokio::test]
async fn upload_many_processes_files_in_order() {
    let (storage, service) = setup();
    let files = vec![
        jpeg(MIB),
        jpeg(10 * MIB),
        FileHandle::new("notes.txt", "text/plain", vec![1]),
        jpeg(2 * MIB),
    ];
    let results = service
        .upload_many(
            files,
            &jpeg_target(),
            &PathParams::course("3"),
            &ProgressReporter::default(),
        )
        .await;

    let states: Vec<&str> = results
        .iter()
        .map(|r| r.as_ref().unwrap().state().name())
        .collect();
    assert_eq!(states, vec!["succeeded", "rejected", "rejected", "succeeded"]);
    assert_eq!(storage.upload_calls(), 2);
}
