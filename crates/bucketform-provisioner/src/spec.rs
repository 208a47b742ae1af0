use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The validated desired state of one bucket.
///
/// Built from a [`BucketDeclaration`](crate::declaration::BucketDeclaration)
/// and read-only from then on. Optional blocks that are `None` are not
/// managed: the reconciler never touches them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub bucket: String,
    pub acl: Acl,
    pub versioning: Option<Versioning>,
    pub logging: Option<LoggingTarget>,
    pub encryption: Option<Encryption>,
    /// Expected default Object Lock retention. Checked against the bucket,
    /// never written: see [`ObjectLockRetention`].
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub object_lock: Option<ObjectLockRetention>,
}

impl ResourceSpec {
    /// A private bucket with every optional block left undeclared.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            acl: Acl::Private,
            versioning: None,
            logging: None,
            encryption: None,
            object_lock: None,
        }
    }

    pub fn with_acl(mut self, acl: Acl) -> Self {
        self.acl = acl;
        self
    }

    pub fn with_versioning(mut self, enabled: bool) -> Self {
        self.versioning = Some(Versioning { enabled });
        self
    }

    pub fn with_logging(
        mut self,
        target_bucket: impl Into<String>,
        target_prefix: impl Into<String>,
    ) -> Self {
        self.logging = Some(LoggingTarget {
            target_bucket: target_bucket.into(),
            target_prefix: target_prefix.into(),
        });
        self
    }

    pub fn with_encryption(mut self, algorithm: SseAlgorithm) -> Self {
        self.encryption = Some(Encryption {
            algorithm,
            kms_master_key_id: None,
        });
        self
    }

    pub fn with_object_lock(mut self, mode: ObjectLockMode, days: u32) -> Self {
        self.object_lock = Some(ObjectLockRetention { mode, days });
        self
    }

    /// Check everything that can be checked without talking to the provider.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_bucket_name(&self.bucket)?;

        if let Some(logging) = &self.logging {
            if logging.target_bucket.trim().is_empty() {
                return Err(ConfigError::EmptyLoggingTarget);
            }
        }

        if let Some(encryption) = &self.encryption {
            if encryption.kms_master_key_id.is_some() && !encryption.algorithm.is_kms() {
                return Err(ConfigError::KmsKeyWithoutKms(
                    encryption.algorithm.to_string(),
                ));
            }
        }

        if let Some(retention) = &self.object_lock {
            if retention.days == 0 {
                return Err(ConfigError::InvalidObjectLockDays("0".into()));
            }
        }

        Ok(())
    }
}

/// Canned bucket ACLs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    LogDeliveryWrite,
}

impl Acl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::PublicReadWrite => "public-read-write",
            Acl::AuthenticatedRead => "authenticated-read",
            Acl::LogDeliveryWrite => "log-delivery-write",
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Acl {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "private" => Ok(Acl::Private),
            "public-read" => Ok(Acl::PublicRead),
            "public-read-write" => Ok(Acl::PublicReadWrite),
            "authenticated-read" => Ok(Acl::AuthenticatedRead),
            "log-delivery-write" => Ok(Acl::LogDeliveryWrite),
            other => Err(ConfigError::UnknownAcl(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioning {
    pub enabled: bool,
}

/// Where access logs for the bucket are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingTarget {
    pub target_bucket: String,
    pub target_prefix: String,
}

/// Default server-side encryption for new objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encryption {
    pub algorithm: SseAlgorithm,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub kms_master_key_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SseAlgorithm {
    #[serde(rename = "AES256")]
    Aes256,
    #[serde(rename = "aws:kms")]
    AwsKms,
    #[serde(rename = "aws:kms:dsse")]
    AwsKmsDsse,
}

impl SseAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SseAlgorithm::Aes256 => "AES256",
            SseAlgorithm::AwsKms => "aws:kms",
            SseAlgorithm::AwsKmsDsse => "aws:kms:dsse",
        }
    }

    pub fn is_kms(&self) -> bool {
        matches!(self, SseAlgorithm::AwsKms | SseAlgorithm::AwsKmsDsse)
    }
}

impl fmt::Display for SseAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SseAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "AES256" => Ok(SseAlgorithm::Aes256),
            "aws:kms" | "KMS" => Ok(SseAlgorithm::AwsKms),
            "aws:kms:dsse" => Ok(SseAlgorithm::AwsKmsDsse),
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Default retention for new object versions under S3 Object Lock.
///
/// Object Lock can only be switched on when a bucket is created, so the
/// reconciler treats it as a property to verify rather than converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLockRetention {
    pub mode: ObjectLockMode,
    pub days: u32,
}

impl fmt::Display for ObjectLockRetention {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} for {} days", self.mode, self.days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObjectLockMode {
    Governance,
    Compliance,
}

impl ObjectLockMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectLockMode::Governance => "GOVERNANCE",
            ObjectLockMode::Compliance => "COMPLIANCE",
        }
    }
}

impl fmt::Display for ObjectLockMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectLockMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GOVERNANCE" => Ok(ObjectLockMode::Governance),
            "COMPLIANCE" => Ok(ObjectLockMode::Compliance),
            _ => Err(ConfigError::UnknownObjectLockMode(s.trim().to_string())),
        }
    }
}

/// S3 general-purpose bucket naming rules.
fn validate_bucket_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidBucketName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(ConfigError::EmptyBucketName);
    }
    if name.len() < 3 || name.len() > 63 {
        return Err(invalid("must be between 3 and 63 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err(invalid(
            "only lowercase letters, digits, dots and hyphens are allowed",
        ));
    }

    let bytes = name.as_bytes();
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !alnum(bytes[0]) || !alnum(bytes[bytes.len() - 1]) {
        return Err(invalid("must begin and end with a letter or digit"));
    }
    if name.contains("..") {
        return Err(invalid("must not contain two adjacent dots"));
    }
    if name.parse::<std::net::Ipv4Addr>().is_ok() {
        return Err(invalid("must not be formatted as an IP address"));
    }

    Ok(())
}

