use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observed::ObservedState;
use crate::operation::Operation;
use crate::spec::ObjectLockRetention;

/// The declaration cannot be turned into a plan.
///
/// Raised before any operation is planned and never retried: fixing it
/// requires changing the declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("bucket name must not be empty")]
    EmptyBucketName,

    #[error("invalid bucket name {name:?}: {reason}")]
    InvalidBucketName { name: String, reason: &'static str },

    #[error("unrecognized ACL: {0}")]
    UnknownAcl(String),

    #[error("unrecognized encryption algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("logging target bucket must not be empty")]
    EmptyLoggingTarget,

    #[error("KMS key id given for non-KMS algorithm {0}")]
    KmsKeyWithoutKms(String),

    #[error("unrecognized object lock mode: {0}")]
    UnknownObjectLockMode(String),

    #[error("object lock retention must be a positive number of days, got {0:?}")]
    InvalidObjectLockDays(String),

    #[error("OBJECT_LOCK_DEFAULT_MODE and OBJECT_LOCK_DEFAULT_DAYS must be set together")]
    IncompleteObjectLock,

    #[error("bucket {bucket} enforces bucket-owner ownership; ACL {acl} cannot be applied")]
    AclDisabled { bucket: String, acl: String },
}

/// A call against the remote provider failed.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("bucket read failed: {0}")]
    ReadFailed(String),

    #[error("bucket creation failed: {0}")]
    CreateFailed(String),

    #[error("bucket update failed: {0}")]
    UpdateFailed(String),

    #[error("bucket deletion failed: {0}")]
    DeleteFailed(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("AWS error: {0}")]
    Aws(String),
}

impl ProviderError {
    /// Prepend the bucket name to the error message.
    pub fn with_bucket(self, bucket: &str) -> Self {
        match self {
            Self::ReadFailed(msg) => Self::ReadFailed(format!("{bucket}: {msg}")),
            Self::CreateFailed(msg) => Self::CreateFailed(format!("{bucket}: {msg}")),
            Self::UpdateFailed(msg) => Self::UpdateFailed(format!("{bucket}: {msg}")),
            Self::DeleteFailed(msg) => Self::DeleteFailed(format!("{bucket}: {msg}")),
            Self::Conflict(msg) => Self::Conflict(format!("{bucket}: {msg}")),
            Self::Aws(msg) => Self::Aws(format!("{bucket}: {msg}")),
        }
    }
}

/// Advisory marker for a destructive plan.
///
/// Only surfaces as an error when a caller asks to apply the plan without
/// confirming the replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("bucket {from} must be destroyed and recreated as {to}")]
pub struct ReplaceRequired {
    pub from: String,
    pub to: String,
}

/// The bucket's Object Lock retention differs from the declared one.
///
/// Object Lock is never changed by the reconciler, so this is reported
/// instead of planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error(
    "object lock on {bucket} does not match: declared {declared}, found {}",
    .observed.map_or_else(|| "none".to_string(), |o| o.to_string())
)]
pub struct ObjectLockMismatch {
    pub bucket: String,
    pub declared: ObjectLockRetention,
    pub observed: Option<ObjectLockRetention>,
}

/// Apply stopped at a failing operation.
#[derive(Debug, Error)]
#[error("operation {index} ({failed}) failed after {} succeeded: {source}", .completed.len())]
pub struct ApplyError {
    /// Position of the failed operation in the applied sequence.
    pub index: usize,
    pub completed: Vec<Operation>,
    pub failed: Operation,
    /// Operations after the failed one; never attempted.
    pub unattempted: Vec<Operation>,
    /// State as of the last successful operation.
    pub state: Option<ObservedState>,
    #[source]
    pub source: ProviderError,
}

impl ApplyError {
    /// Operations still to run to finish the interrupted sequence.
    pub fn resume(&self) -> Vec<Operation> {
        std::iter::once(self.failed.clone())
            .chain(self.unattempted.iter().cloned())
            .collect()
    }

    /// The bucket a `Create` in this run may have brought into existence,
    /// whether or not the create finished.
    pub fn attempted_create(&self) -> Option<&str> {
        self.completed
            .iter()
            .chain(std::iter::once(&self.failed))
            .rev()
            .find_map(|op| match op {
                Operation::Create(spec) => Some(spec.bucket.as_str()),
                _ => None,
            })
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    ReplaceRequired(#[from] ReplaceRequired),

    #[error(transparent)]
    Apply(#[from] Box<ApplyError>),

    #[error(transparent)]
    ObjectLock(#[from] ObjectLockMismatch),

    #[error("state error: {0}")]
    State(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Walk the full error chain and join all causes into one string.
///
/// AWS SDK errors often have terse `Display` impls (e.g. "service error")
/// but useful detail in the source chain.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
