//! The bucket as a user declares it, before validation.
//!
//! Field names and nesting follow the declarative `aws_s3_bucket` block:
//!
//! ```json
//! {
//!   "bucket": "mybucket",
//!   "acl": "private",
//!   "versioning": { "enabled": true },
//!   "logging": { "target_bucket": "my-log-bucket", "target_prefix": "log/" },
//!   "server_side_encryption_configuration": {
//!     "rule": {
//!       "apply_server_side_encryption_by_default": { "sse_algorithm": "AES256" }
//!     }
//!   },
//!   "object_lock_configuration": {
//!     "rule": { "default_retention": { "mode": "GOVERNANCE", "days": 30 } }
//!   }
//! }
//! ```

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ReconcileError};
use crate::spec::{
    Acl, Encryption, LoggingTarget, ObjectLockMode, ObjectLockRetention, ResourceSpec, SseAlgorithm,
    Versioning,
};

pub const DEFAULT_BUCKET_NAME: &str = "default_bucket_name";
pub const DEFAULT_LOG_TARGET: &str = "my-log-bucket";
pub const DEFAULT_LOG_PREFIX: &str = "log/";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDeclaration {
    pub bucket: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub acl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub versioning: Option<VersioningBlock>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub logging: Option<LoggingBlock>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub server_side_encryption_configuration: Option<EncryptionBlock>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub object_lock_configuration: Option<ObjectLockBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersioningBlock {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingBlock {
    pub target_bucket: String,
    #[serde(default)]
    pub target_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionBlock {
    pub rule: EncryptionRule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionRule {
    pub apply_server_side_encryption_by_default: EncryptionDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionDefault {
    pub sse_algorithm: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub kms_master_key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLockBlock {
    pub rule: ObjectLockRule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLockRule {
    pub default_retention: DefaultRetention,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultRetention {
    pub mode: String,
    pub days: u32,
}

impl EncryptionBlock {
    pub fn new(sse_algorithm: impl Into<String>) -> Self {
        Self {
            rule: EncryptionRule {
                apply_server_side_encryption_by_default: EncryptionDefault {
                    sse_algorithm: sse_algorithm.into(),
                    kms_master_key_id: None,
                },
            },
        }
    }
}

impl BucketDeclaration {
    /// Read a JSON declaration from disk.
    pub fn from_path(path: &Path) -> Result<Self, ReconcileError> {
        let contents = std::fs::read(path)?;
        Ok(serde_json::from_slice(&contents)?)
    }

    /// Build a declaration from environment variables.
    ///
    /// `BUCKET_NAME` names the bucket. `BUCKET_VERSIONING`, `BUCKET_LOGGING`
    /// and `BUCKET_ENCRYPTION` switch their blocks on when set to `true`;
    /// anything else leaves the block undeclared. `BUCKET_ACL`,
    /// `BUCKET_LOG_TARGET`, `BUCKET_LOG_PREFIX` and `BUCKET_SSE_ALGORITHM`
    /// override the defaults. `OBJECT_LOCK_DEFAULT_MODE` and
    /// `OBJECT_LOCK_DEFAULT_DAYS`, set together, declare the Object Lock
    /// retention the bucket is expected to carry.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str| lookup(name).is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        let or_default = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let object_lock_configuration = match (
            lookup("OBJECT_LOCK_DEFAULT_MODE").filter(|v| !v.trim().is_empty()),
            lookup("OBJECT_LOCK_DEFAULT_DAYS").filter(|v| !v.trim().is_empty()),
        ) {
            (Some(mode), Some(days)) => Some(ObjectLockBlock {
                rule: ObjectLockRule {
                    default_retention: DefaultRetention {
                        mode: mode.trim().to_string(),
                        days: days
                            .trim()
                            .parse()
                            .map_err(|_| ConfigError::InvalidObjectLockDays(days.clone()))?,
                    },
                },
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteObjectLock),
        };

        Ok(Self {
            bucket: or_default("BUCKET_NAME", DEFAULT_BUCKET_NAME),
            acl: Some(or_default("BUCKET_ACL", "private")),
            versioning: flag("BUCKET_VERSIONING").then_some(VersioningBlock { enabled: true }),
            logging: flag("BUCKET_LOGGING").then(|| LoggingBlock {
                target_bucket: or_default("BUCKET_LOG_TARGET", DEFAULT_LOG_TARGET),
                target_prefix: or_default("BUCKET_LOG_PREFIX", DEFAULT_LOG_PREFIX),
            }),
            server_side_encryption_configuration: flag("BUCKET_ENCRYPTION")
                .then(|| EncryptionBlock::new(or_default("BUCKET_SSE_ALGORITHM", "AES256"))),
            object_lock_configuration,
        })
    }

    /// Validate into a [`ResourceSpec`].
    pub fn into_spec(self) -> Result<ResourceSpec, ConfigError> {
        let acl: Acl = match self.acl.as_deref() {
            Some(acl) => acl.parse()?,
            None => Acl::default(),
        };

        let encryption = match self.server_side_encryption_configuration {
            Some(block) => {
                let default = block.rule.apply_server_side_encryption_by_default;
                Some(Encryption {
                    algorithm: default.sse_algorithm.parse::<SseAlgorithm>()?,
                    kms_master_key_id: default.kms_master_key_id,
                })
            }
            None => None,
        };

        let object_lock = match self.object_lock_configuration {
            Some(block) => {
                let retention = block.rule.default_retention;
                Some(ObjectLockRetention {
                    mode: retention.mode.parse::<ObjectLockMode>()?,
                    days: retention.days,
                })
            }
            None => None,
        };

        let spec = ResourceSpec {
            bucket: self.bucket.trim().to_string(),
            acl,
            versioning: self.versioning.map(|v| Versioning { enabled: v.enabled }),
            logging: self.logging.map(|l| LoggingTarget {
                target_bucket: l.target_bucket,
                target_prefix: l.target_prefix,
            }),
            encryption,
            object_lock,
        };
        spec.validate()?;
        Ok(spec)
    }
}

impl From<&ResourceSpec> for BucketDeclaration {
    fn from(spec: &ResourceSpec) -> Self {
        Self {
            bucket: spec.bucket.clone(),
            acl: Some(spec.acl.to_string()),
            versioning: spec.versioning.map(|v| VersioningBlock { enabled: v.enabled }),
            logging: spec.logging.as_ref().map(|l| LoggingBlock {
                target_bucket: l.target_bucket.clone(),
                target_prefix: l.target_prefix.clone(),
            }),
            server_side_encryption_configuration: spec.encryption.as_ref().map(|e| {
                let mut block = EncryptionBlock::new(e.algorithm.as_str());
                block.rule.apply_server_side_encryption_by_default.kms_master_key_id =
                    e.kms_master_key_id.clone();
                block
            }),
            object_lock_configuration: spec.object_lock.map(|retention| ObjectLockBlock {
                rule: ObjectLockRule {
                    default_retention: DefaultRetention {
                        mode: retention.mode.to_string(),
                        days: retention.days,
                    },
                },
            }),
        }
    }
}
