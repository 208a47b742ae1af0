use std::fmt;

use serde::{Deserialize, Serialize};

use crate::observed::ObservedState;
use crate::spec::{Acl, Encryption, LoggingTarget, ResourceSpec, Versioning};

/// One idempotent side effect against the provider.
///
/// Each variant carries exactly the delta it applies. Re-running an
/// operation that already succeeded leaves the bucket unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Create(ResourceSpec),
    Delete {
        bucket: String,
    },
    UpdateAcl {
        bucket: String,
        acl: Acl,
    },
    UpdateVersioning {
        bucket: String,
        enabled: bool,
    },
    UpdateLogging {
        bucket: String,
        target: LoggingTarget,
    },
    UpdateEncryption {
        bucket: String,
        encryption: Encryption,
    },
}

impl Operation {
    pub fn bucket(&self) -> &str {
        match self {
            Operation::Create(spec) => &spec.bucket,
            Operation::Delete { bucket }
            | Operation::UpdateAcl { bucket, .. }
            | Operation::UpdateVersioning { bucket, .. }
            | Operation::UpdateLogging { bucket, .. }
            | Operation::UpdateEncryption { bucket, .. } => bucket,
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, Operation::Delete { .. })
    }

    /// Record an update's effect on a local copy of the bucket state, so
    /// apply can report the result without another read. `Create` and
    /// `Delete` swap the whole state and are handled by apply itself.
    pub(crate) fn fold_update(&self, state: &mut ObservedState) {
        match self {
            Operation::UpdateAcl { acl, .. } => state.acl = Some(*acl),
            Operation::UpdateVersioning { enabled, .. } => {
                state.versioning = Some(Versioning { enabled: *enabled });
            }
            Operation::UpdateLogging { target, .. } => state.logging = Some(target.clone()),
            Operation::UpdateEncryption { encryption, .. } => {
                state.encryption = Some(encryption.clone());
            }
            Operation::Create(_) | Operation::Delete { .. } => {}
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operation::Create(spec) => write!(f, "create {}", spec.bucket),
            Operation::Delete { bucket } => write!(f, "delete {bucket}"),
            Operation::UpdateAcl { bucket, acl } => write!(f, "set acl of {bucket} to {acl}"),
            Operation::UpdateVersioning { bucket, enabled } => {
                let status = if *enabled { "enabled" } else { "suspended" };
                write!(f, "set versioning of {bucket} to {status}")
            }
            Operation::UpdateLogging { bucket, target } => write!(
                f,
                "send access logs of {bucket} to {}/{}",
                target.target_bucket, target.target_prefix
            ),
            Operation::UpdateEncryption { bucket, encryption } => write!(
                f,
                "set default encryption of {bucket} to {}",
                encryption.algorithm
            ),
        }
    }
}
