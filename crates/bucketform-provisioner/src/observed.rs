use serde::{Deserialize, Serialize};

use crate::spec::{Acl, Encryption, LoggingTarget, ObjectLockRetention, ResourceSpec, Versioning};

/// A snapshot of the bucket as the provider reports it.
///
/// Fetched fresh for every planning cycle. Mirrors [`ResourceSpec`] with an
/// existence flag and the time it was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedState {
    pub bucket: String,
    pub exists: bool,
    /// `None` when the remote grants do not match a canned ACL.
    pub acl: Option<Acl>,
    /// Bucket-owner-enforced object ownership: ACLs are disabled.
    #[serde(default)]
    pub acl_disabled: bool,
    /// `None` for a bucket that never had versioning configured.
    pub versioning: Option<Versioning>,
    pub logging: Option<LoggingTarget>,
    pub encryption: Option<Encryption>,
    /// Default Object Lock retention. `None` when the bucket has no lock
    /// configuration or no default retention.
    #[serde(default)]
    pub object_lock: Option<ObjectLockRetention>,
    pub observed_at: jiff::Timestamp,
}

impl ObservedState {
    /// A bucket matching `spec` in every declared field.
    pub fn from_spec(spec: &ResourceSpec) -> Self {
        Self {
            bucket: spec.bucket.clone(),
            exists: true,
            acl: Some(spec.acl),
            acl_disabled: false,
            versioning: spec.versioning,
            logging: spec.logging.clone(),
            encryption: spec.encryption.clone(),
            object_lock: spec.object_lock,
            observed_at: jiff::Timestamp::now(),
        }
    }

    pub fn versioning_enabled(&self) -> bool {
        self.versioning.is_some_and(|v| v.enabled)
    }

    /// Field-for-field comparison that ignores when the state was observed.
    pub fn same_configuration(&self, other: &ObservedState) -> bool {
        self.bucket == other.bucket
            && self.exists == other.exists
            && self.acl == other.acl
            && self.acl_disabled == other.acl_disabled
            && self.versioning_enabled() == other.versioning_enabled()
            && self.logging == other.logging
            && self.encryption == other.encryption
            && self.object_lock == other.object_lock
    }
}
