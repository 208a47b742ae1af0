use std::collections::HashMap;

use bucketform_provisioner::declaration::{EncryptionBlock, DEFAULT_LOG_PREFIX, DEFAULT_LOG_TARGET};
use bucketform_provisioner::{
    Acl, BucketDeclaration, ConfigError, LoggingTarget, ObjectLockMode, ObjectLockRetention,
    ResourceSpec, SseAlgorithm, Versioning,
};

const FULL: &str = r#"{
    "bucket": "mybucket",
    "acl": "private",
    "versioning": { "enabled": true },
    "logging": { "target_bucket": "my-log-bucket", "target_prefix": "log/" },
    "server_side_encryption_configuration": {
        "rule": {
            "apply_server_side_encryption_by_default": { "sse_algorithm": "AES256" }
        }
    }
}"#;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn full_declaration_becomes_spec() {
    let declaration: BucketDeclaration = serde_json::from_str(FULL).unwrap();
    let spec = declaration.into_spec().unwrap();

    assert_eq!(spec.bucket, "mybucket");
    assert_eq!(spec.acl, Acl::Private);
    assert_eq!(spec.versioning, Some(Versioning { enabled: true }));
    assert_eq!(
        spec.logging,
        Some(LoggingTarget {
            target_bucket: "my-log-bucket".into(),
            target_prefix: "log/".into(),
        })
    );
    assert_eq!(spec.encryption.unwrap().algorithm, SseAlgorithm::Aes256);
}

#[test]
fn missing_blocks_stay_undeclared() {
    let declaration: BucketDeclaration = serde_json::from_str(r#"{"bucket": "mybucket"}"#).unwrap();
    let spec = declaration.into_spec().unwrap();

    assert_eq!(spec, ResourceSpec::new("mybucket"));
}

#[test]
fn disabled_versioning_is_not_absent_versioning() {
    let declaration: BucketDeclaration =
        serde_json::from_str(r#"{"bucket": "mybucket", "versioning": {"enabled": false}}"#).unwrap();
    let spec = declaration.into_spec().unwrap();

    assert_eq!(spec.versioning, Some(Versioning { enabled: false }));
}

#[test]
fn unknown_values_are_config_errors() {
    let declaration = BucketDeclaration {
        bucket: "mybucket".into(),
        acl: Some("world-writable".into()),
        ..Default::default()
    };
    assert_eq!(
        declaration.into_spec(),
        Err(ConfigError::UnknownAcl("world-writable".into()))
    );

    let declaration = BucketDeclaration {
        bucket: "mybucket".into(),
        server_side_encryption_configuration: Some(EncryptionBlock::new("ROT13")),
        ..Default::default()
    };
    assert_eq!(
        declaration.into_spec(),
        Err(ConfigError::UnknownAlgorithm("ROT13".into()))
    );

    let declaration = BucketDeclaration::default();
    assert_eq!(declaration.into_spec(), Err(ConfigError::EmptyBucketName));
}

#[test]
fn env_flags_switch_blocks_on() {
    let declaration = BucketDeclaration::from_lookup(lookup(&[
        ("BUCKET_NAME", "mybucket"),
        ("BUCKET_VERSIONING", "TRUE"),
        ("BUCKET_LOGGING", "true"),
        ("BUCKET_ENCRYPTION", "true"),
    ]))
    .unwrap();
    let spec = declaration.into_spec().unwrap();

    assert_eq!(spec.acl, Acl::Private);
    assert_eq!(spec.versioning, Some(Versioning { enabled: true }));
    let logging = spec.logging.unwrap();
    assert_eq!(logging.target_bucket, DEFAULT_LOG_TARGET);
    assert_eq!(logging.target_prefix, DEFAULT_LOG_PREFIX);
    assert_eq!(spec.encryption.unwrap().algorithm, SseAlgorithm::Aes256);
}

#[test]
fn env_flags_other_than_true_leave_blocks_out() {
    let declaration = BucketDeclaration::from_lookup(lookup(&[
        ("BUCKET_NAME", "mybucket"),
        ("BUCKET_VERSIONING", "yes"),
        ("BUCKET_LOGGING", "false"),
    ]))
    .unwrap();

    assert_eq!(declaration.into_spec().unwrap(), ResourceSpec::new("mybucket"));
}

#[test]
fn env_overrides_defaults() {
    let declaration = BucketDeclaration::from_lookup(lookup(&[
        ("BUCKET_NAME", "mybucket"),
        ("BUCKET_ACL", "public-read"),
        ("BUCKET_LOGGING", "true"),
        ("BUCKET_LOG_TARGET", "audit-logs"),
        ("BUCKET_LOG_PREFIX", "s3/"),
        ("BUCKET_ENCRYPTION", "true"),
        ("BUCKET_SSE_ALGORITHM", "aws:kms"),
    ]))
    .unwrap();
    let spec = declaration.into_spec().unwrap();

    assert_eq!(spec.acl, Acl::PublicRead);
    assert_eq!(spec.logging.unwrap().target_bucket, "audit-logs");
    assert_eq!(spec.encryption.unwrap().algorithm, SseAlgorithm::AwsKms);
}

#[test]
fn env_default_bucket_name_is_not_a_valid_bucket() {
    let declaration = BucketDeclaration::from_lookup(lookup(&[])).unwrap();

    assert_eq!(declaration.bucket, "default_bucket_name");
    assert!(matches!(
        declaration.into_spec(),
        Err(ConfigError::InvalidBucketName { .. })
    ));
}

#[test]
fn spec_converts_back_to_same_declaration() {
    let declaration: BucketDeclaration = serde_json::from_str(FULL).unwrap();
    let spec = declaration.clone().into_spec().unwrap();

    assert_eq!(BucketDeclaration::from(&spec), declaration);
}

#[test]
fn env_object_lock_needs_mode_and_days() {
    let declaration = BucketDeclaration::from_lookup(lookup(&[
        ("BUCKET_NAME", "mybucket"),
        ("OBJECT_LOCK_DEFAULT_MODE", "governance"),
        ("OBJECT_LOCK_DEFAULT_DAYS", "30"),
    ]))
    .unwrap();
    assert_eq!(
        declaration.into_spec().unwrap().object_lock,
        Some(ObjectLockRetention {
            mode: ObjectLockMode::Governance,
            days: 30,
        })
    );

    let only_mode = BucketDeclaration::from_lookup(lookup(&[
        ("BUCKET_NAME", "mybucket"),
        ("OBJECT_LOCK_DEFAULT_MODE", "COMPLIANCE"),
    ]));
    assert_eq!(only_mode, Err(ConfigError::IncompleteObjectLock));

    let bad_days = BucketDeclaration::from_lookup(lookup(&[
        ("BUCKET_NAME", "mybucket"),
        ("OBJECT_LOCK_DEFAULT_MODE", "COMPLIANCE"),
        ("OBJECT_LOCK_DEFAULT_DAYS", "a week"),
    ]));
    assert_eq!(
        bad_days,
        Err(ConfigError::InvalidObjectLockDays("a week".into()))
    );
}

#[test]
fn object_lock_block_is_validated() {
    let declaration: BucketDeclaration = serde_json::from_str(
        r#"{
            "bucket": "mybucket",
            "object_lock_configuration": {
                "rule": { "default_retention": { "mode": "LEGAL", "days": 30 } }
            }
        }"#,
    )
    .unwrap();
    assert_eq!(
        declaration.into_spec(),
        Err(ConfigError::UnknownObjectLockMode("LEGAL".into()))
    );

    let zero_days = BucketDeclaration::from(
        &ResourceSpec::new("mybucket").with_object_lock(ObjectLockMode::Governance, 0),
    );
    assert_eq!(
        zero_days.into_spec(),
        Err(ConfigError::InvalidObjectLockDays("0".into()))
    );
}
