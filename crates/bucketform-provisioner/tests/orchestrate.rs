use std::sync::Arc;

use bucketform_provisioner::providers::{Fault, MemoryProvider, ProviderCall};
use bucketform_provisioner::{
    destroy, preview, provision, Acl, ConfigError, ObjectLockMode, Operation, ReconcileError,
    Reconciler, ResourceSpec, ResourceStatus, SseAlgorithm, StatePersistence,
};

struct Harness {
    _dir: tempfile::TempDir,
    provider: Arc<MemoryProvider>,
    reconciler: Reconciler,
    persistence: StatePersistence,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(MemoryProvider::new());
    Harness {
        persistence: StatePersistence::new(dir.path().join("state/state.json")),
        reconciler: Reconciler::new(provider.clone()),
        provider,
        _dir: dir,
    }
}

fn spec(name: &str) -> ResourceSpec {
    ResourceSpec::new(name)
        .with_versioning(true)
        .with_logging("my-log-bucket", "log/")
        .with_encryption(SseAlgorithm::Aes256)
}

#[tokio::test]
async fn provision_creates_and_records_state() {
    let h = harness();

    let observed = provision(&h.reconciler, &h.persistence, &spec("mybucket"), false)
        .await
        .unwrap();
    assert_eq!(observed.bucket, "mybucket");

    let state = h.persistence.load().await.unwrap();
    assert_eq!(state.bucket.as_deref(), Some("mybucket"));
    assert_eq!(state.status, Some(ResourceStatus::Created));
    assert!(state.last_observed.is_some());
}

#[tokio::test]
async fn second_provision_is_in_sync() {
    let h = harness();
    provision(&h.reconciler, &h.persistence, &spec("mybucket"), false)
        .await
        .unwrap();
    h.provider.clear_calls();

    provision(&h.reconciler, &h.persistence, &spec("mybucket"), false)
        .await
        .unwrap();

    assert_eq!(h.provider.calls(), vec![ProviderCall::GetBucketState]);
    let state = h.persistence.load().await.unwrap();
    assert_eq!(state.status, Some(ResourceStatus::InSync));
}

#[tokio::test]
async fn drift_is_corrected() {
    let h = harness();
    provision(&h.reconciler, &h.persistence, &spec("mybucket"), false)
        .await
        .unwrap();

    h.provider.insert({
        let mut drifted = h.provider.bucket("mybucket").unwrap();
        drifted.acl = Some(Acl::PublicRead);
        drifted
    });

    let observed = provision(&h.reconciler, &h.persistence, &spec("mybucket"), false)
        .await
        .unwrap();
    assert_eq!(observed.acl, Some(Acl::Private));
    assert_eq!(
        h.persistence.load().await.unwrap().status,
        Some(ResourceStatus::Updated)
    );
}

#[tokio::test]
async fn rename_needs_confirmation() {
    let h = harness();
    provision(&h.reconciler, &h.persistence, &spec("old-name"), false)
        .await
        .unwrap();

    let preview = preview(
        &h.reconciler,
        &h.persistence.load().await.unwrap(),
        &spec("mybucket"),
    )
    .await
    .unwrap();
    assert_eq!(preview.recorded_bucket, "old-name");
    assert!(preview.plan.is_destructive());

    let err = provision(&h.reconciler, &h.persistence, &spec("mybucket"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::ReplaceRequired(_)));
    assert_eq!(h.provider.bucket_names(), vec!["old-name".to_string()]);

    provision(&h.reconciler, &h.persistence, &spec("mybucket"), true)
        .await
        .unwrap();
    assert_eq!(h.provider.bucket_names(), vec!["mybucket".to_string()]);

    let state = h.persistence.load().await.unwrap();
    assert_eq!(state.bucket.as_deref(), Some("mybucket"));
    assert_eq!(state.status, Some(ResourceStatus::Replaced));
}

#[tokio::test]
async fn partial_apply_is_persisted_and_resumed() {
    let h = harness();
    h.provider
        .fail_next(ProviderCall::PutBucketEncryption, Fault::Reject);

    let err = provision(&h.reconciler, &h.persistence, &spec("mybucket"), false)
        .await
        .unwrap_err();
    let apply = match err {
        ReconcileError::Apply(apply) => apply,
        other => panic!("expected apply error, got {other:?}"),
    };
    assert!(apply.completed.is_empty());
    assert!(apply.unattempted.is_empty());

    // The bucket itself exists, only encryption is missing.
    let state = h.persistence.load().await.unwrap();
    assert_eq!(state.status, Some(ResourceStatus::Partial));
    assert_eq!(h.provider.bucket("mybucket").unwrap().encryption, None);

    provision(&h.reconciler, &h.persistence, &spec("mybucket"), false)
        .await
        .unwrap();
    assert!(h.provider.bucket("mybucket").unwrap().encryption.is_some());
}

#[tokio::test]
async fn destroy_after_partial_create_removes_bucket() {
    let h = harness();
    h.provider
        .fail_next(ProviderCall::PutBucketVersioning, Fault::Reject);

    provision(&h.reconciler, &h.persistence, &spec("mybucket"), false)
        .await
        .unwrap_err();

    let state = h.persistence.load().await.unwrap();
    assert_eq!(state.status, Some(ResourceStatus::Partial));
    assert_eq!(state.bucket.as_deref(), Some("mybucket"));
    assert_eq!(h.provider.bucket_names(), vec!["mybucket".to_string()]);

    destroy(&h.reconciler, &h.persistence).await.unwrap();
    assert!(h.provider.bucket_names().is_empty());
}

#[tokio::test]
async fn failed_replace_keeps_track_of_new_bucket() {
    let h = harness();
    provision(&h.reconciler, &h.persistence, &spec("old-name"), false)
        .await
        .unwrap();
    h.provider
        .fail_next(ProviderCall::PutBucketLogging, Fault::Reject);

    provision(&h.reconciler, &h.persistence, &spec("mybucket"), true)
        .await
        .unwrap_err();

    // The old bucket is gone and the new one half made.
    assert_eq!(h.provider.bucket_names(), vec!["mybucket".to_string()]);
    let state = h.persistence.load().await.unwrap();
    assert_eq!(state.bucket.as_deref(), Some("mybucket"));

    // The next run finishes it in place instead of planning another create.
    let preview = preview(&h.reconciler, &state, &spec("mybucket"))
        .await
        .unwrap();
    assert!(!preview.plan.is_destructive());
    assert!(preview
        .plan
        .operations
        .iter()
        .all(|op| !matches!(op, Operation::Create(_))));

    destroy(&h.reconciler, &h.persistence).await.unwrap();
    assert!(h.provider.bucket_names().is_empty());
}

#[tokio::test]
async fn failed_delete_keeps_old_bucket_recorded() {
    let h = harness();
    provision(&h.reconciler, &h.persistence, &spec("old-name"), false)
        .await
        .unwrap();
    h.provider.fail_next(ProviderCall::DeleteBucket, Fault::Reject);

    provision(&h.reconciler, &h.persistence, &spec("mybucket"), true)
        .await
        .unwrap_err();

    let state = h.persistence.load().await.unwrap();
    assert_eq!(state.bucket.as_deref(), Some("old-name"));
    assert_eq!(h.provider.bucket_names(), vec!["old-name".to_string()]);
}

#[tokio::test]
async fn object_lock_mismatch_fails_after_converging() {
    let h = harness();
    let declared = spec("mybucket").with_object_lock(ObjectLockMode::Governance, 30);

    let err = provision(&h.reconciler, &h.persistence, &declared, false)
        .await
        .unwrap_err();
    let mismatch = match err {
        ReconcileError::ObjectLock(mismatch) => mismatch,
        other => panic!("expected object lock mismatch, got {other:?}"),
    };
    assert_eq!(mismatch.observed, None);

    // Everything else was applied and recorded.
    assert!(h.provider.bucket("mybucket").unwrap().encryption.is_some());
    let state = h.persistence.load().await.unwrap();
    assert_eq!(state.status, Some(ResourceStatus::Created));

    let mut locked = h.provider.bucket("mybucket").unwrap();
    locked.object_lock = declared.object_lock;
    h.provider.insert(locked);
    provision(&h.reconciler, &h.persistence, &declared, false)
        .await
        .unwrap();
}

#[tokio::test]
async fn invalid_spec_makes_no_provider_calls() {
    let h = harness();

    let err = provision(&h.reconciler, &h.persistence, &ResourceSpec::new("Bad_Name"), false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Config(ConfigError::InvalidBucketName { .. })
    ));
    assert!(h.provider.calls().is_empty());
}

#[tokio::test]
async fn acl_conflict_is_reported_without_changes() {
    let h = harness();
    provision(&h.reconciler, &h.persistence, &spec("mybucket"), false)
        .await
        .unwrap();
    h.provider.disable_acls("mybucket");
    h.provider.clear_calls();

    let public = spec("mybucket").with_acl(Acl::PublicRead);
    let err = provision(&h.reconciler, &h.persistence, &public, false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Config(ConfigError::AclDisabled { .. })
    ));
    assert_eq!(h.provider.calls(), vec![ProviderCall::GetBucketState]);
}

#[tokio::test]
async fn destroy_removes_bucket_and_state() {
    let h = harness();
    provision(&h.reconciler, &h.persistence, &spec("mybucket"), false)
        .await
        .unwrap();

    destroy(&h.reconciler, &h.persistence).await.unwrap();

    assert!(h.provider.bucket_names().is_empty());
    let state = h.persistence.load().await.unwrap();
    assert!(state.bucket.is_none());
    assert!(state.last_observed.is_none());

    // Nothing left to destroy.
    destroy(&h.reconciler, &h.persistence).await.unwrap();
}

#[tokio::test]
async fn missing_state_file_loads_as_default() {
    let h = harness();
    let state = h.persistence.load().await.unwrap();

    assert!(state.bucket.is_none());
    assert!(state.status.is_none());
}
