use bucketform_provisioner::providers::s3::create_bucket_error;
use bucketform_provisioner::{Acl, ProviderError};

#[test]
fn already_owned_bucket_counts_as_created() {
    let result = create_bucket_error(
        Some("BucketAlreadyOwnedByYou"),
        "mybucket",
        Acl::Private,
        "service error".into(),
    );
    assert!(result.is_ok());
}

#[test]
fn name_taken_elsewhere_is_a_conflict() {
    let err = create_bucket_error(
        Some("BucketAlreadyExists"),
        "mybucket",
        Acl::Private,
        "service error".into(),
    )
    .unwrap_err();
    assert!(matches!(err, ProviderError::Conflict(msg) if msg.contains("another account")));
}

#[test]
fn public_acl_blocked_by_public_access_block_is_a_conflict() {
    let err = create_bucket_error(
        Some("InvalidBucketAclWithBlockPublicAccessError"),
        "mybucket",
        Acl::PublicRead,
        "service error".into(),
    )
    .unwrap_err();

    let msg = match err {
        ProviderError::Conflict(msg) => msg,
        other => panic!("expected conflict, got {other:?}"),
    };
    assert!(msg.contains("Block Public Access"));
    assert!(msg.contains("public-read"));
}

#[test]
fn other_failures_keep_their_detail() {
    let err = create_bucket_error(
        Some("InvalidBucketName"),
        "mybucket",
        Acl::Private,
        "InvalidBucketName: the specified bucket is not valid".into(),
    )
    .unwrap_err();
    assert!(matches!(err, ProviderError::CreateFailed(msg) if msg.starts_with("InvalidBucketName")));

    assert!(matches!(
        create_bucket_error(None, "mybucket", Acl::Private, "dispatch failure".into()),
        Err(ProviderError::CreateFailed(_))
    ));
}
