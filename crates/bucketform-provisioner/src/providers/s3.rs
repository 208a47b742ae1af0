use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::types::{
    BucketCannedAcl, BucketLocationConstraint, BucketLoggingStatus, BucketVersioningStatus,
    CreateBucketConfiguration, LoggingEnabled, ObjectLockEnabled, ObjectOwnership, Permission,
    ServerSideEncryption,
    ServerSideEncryptionByDefault, ServerSideEncryptionConfiguration, ServerSideEncryptionRule,
    VersioningConfiguration,
};
use aws_sdk_s3::Client;

use crate::config::ProviderConfig;
use crate::error::{format_err_chain, ProviderError};
use crate::observed::ObservedState;
use crate::provider::{BoxFuture, BucketProvider};
use crate::spec::{
    Acl, Encryption, LoggingTarget, ObjectLockMode, ObjectLockRetention, SseAlgorithm, Versioning,
};

const ALL_USERS: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
const AUTHENTICATED_USERS: &str = "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";
const LOG_DELIVERY: &str = "http://acs.amazonaws.com/groups/s3/LogDelivery";

/// Who an ACL grant is for, reduced to what canned ACLs distinguish.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grantee {
    Owner,
    AllUsers,
    AuthenticatedUsers,
    LogDelivery,
    Other,
}

/// Recognize which canned ACL produced a set of grants.
///
/// Returns `None` for grant sets no canned ACL produces, which the planner
/// then treats as drift.
pub fn canned_acl(grants: &[(Grantee, Permission)]) -> Option<Acl> {
    let mut owner_full_control = false;
    let mut extra = Vec::new();
    for (grantee, permission) in grants {
        if *grantee == Grantee::Owner && *permission == Permission::FullControl {
            owner_full_control = true;
        } else {
            extra.push((grantee.clone(), permission.clone()));
        }
    }
    if !owner_full_control {
        return None;
    }
    extra.sort();
    extra.dedup();

    [
        Acl::Private,
        Acl::PublicRead,
        Acl::PublicReadWrite,
        Acl::AuthenticatedRead,
        Acl::LogDeliveryWrite,
    ]
    .into_iter()
    .find(|acl| canned_grants(*acl) == extra)
}

fn canned_grants(acl: Acl) -> Vec<(Grantee, Permission)> {
    let mut grants = match acl {
        Acl::Private => vec![],
        Acl::PublicRead => vec![(Grantee::AllUsers, Permission::Read)],
        Acl::PublicReadWrite => vec![
            (Grantee::AllUsers, Permission::Read),
            (Grantee::AllUsers, Permission::Write),
        ],
        Acl::AuthenticatedRead => vec![(Grantee::AuthenticatedUsers, Permission::Read)],
        Acl::LogDeliveryWrite => vec![
            (Grantee::LogDelivery, Permission::Write),
            (Grantee::LogDelivery, Permission::ReadAcp),
        ],
    };
    grants.sort();
    grants
}

/// Map a failed `CreateBucket` onto the provider contract by error code.
///
/// A bucket the caller already owns counts as created. A name held by
/// another account and a public ACL refused by Block Public Access are
/// conflicts that retrying cannot fix.
pub fn create_bucket_error(
    code: Option<&str>,
    bucket: &str,
    acl: Acl,
    detail: String,
) -> Result<(), ProviderError> {
    match code {
        Some("BucketAlreadyOwnedByYou") => Ok(()),
        Some("BucketAlreadyExists") => Err(ProviderError::Conflict(format!(
            "bucket name {bucket} is owned by another account"
        ))),
        Some("InvalidBucketAclWithBlockPublicAccessError") => Err(ProviderError::Conflict(format!(
            "Block Public Access is on for {bucket}, so ACL {acl} is refused; \
             turn it off for the bucket or the account, or declare a private ACL"
        ))),
        _ => Err(ProviderError::CreateFailed(detail)),
    }
}

fn service_code<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> Option<&str> {
    err.as_service_error().and_then(ProvideErrorMetadata::code)
}

/// [`BucketProvider`] backed by the AWS S3 SDK.
pub struct S3Provider {
    client: Client,
    region: String,
}

impl S3Provider {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            region: config.region.clone(),
        }
    }

    /// Build the SDK client from `config` and wrap it.
    pub async fn connect(config: &ProviderConfig) -> Self {
        let sdk_config = config.build_sdk_config().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if config.endpoint_url.is_some() {
            builder = builder.force_path_style(true);
        }
        Self::new(Client::from_conf(builder.build()), config)
    }

    async fn read_acl(&self, bucket: &str) -> Result<Option<Acl>, ProviderError> {
        let resp = self
            .client
            .get_bucket_acl()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| ProviderError::ReadFailed(format_err_chain(&e)))?;

        let owner_id = resp.owner().and_then(|o| o.id());
        let grants: Vec<_> = resp
            .grants()
            .iter()
            .filter_map(|grant| {
                let grantee = grant.grantee()?;
                let who = match (grantee.id(), grantee.uri()) {
                    (Some(id), _) if Some(id) == owner_id => Grantee::Owner,
                    (_, Some(ALL_USERS)) => Grantee::AllUsers,
                    (_, Some(AUTHENTICATED_USERS)) => Grantee::AuthenticatedUsers,
                    (_, Some(LOG_DELIVERY)) => Grantee::LogDelivery,
                    _ => Grantee::Other,
                };
                Some((who, grant.permission()?.clone()))
            })
            .collect();

        Ok(canned_acl(&grants))
    }

    async fn read_acl_disabled(&self, bucket: &str) -> Result<bool, ProviderError> {
        match self
            .client
            .get_bucket_ownership_controls()
            .bucket(bucket)
            .send()
            .await
        {
            Ok(resp) => Ok(resp.ownership_controls().is_some_and(|controls| {
                controls
                    .rules()
                    .iter()
                    .any(|rule| *rule.object_ownership() == ObjectOwnership::BucketOwnerEnforced)
            })),
            Err(e) if service_code(&e) == Some("OwnershipControlsNotFoundError") => Ok(false),
            Err(e) => Err(ProviderError::ReadFailed(format_err_chain(&e))),
        }
    }

    async fn read_versioning(&self, bucket: &str) -> Result<Option<Versioning>, ProviderError> {
        let resp = self
            .client
            .get_bucket_versioning()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| ProviderError::ReadFailed(format_err_chain(&e)))?;

        Ok(match resp.status() {
            Some(BucketVersioningStatus::Enabled) => Some(Versioning { enabled: true }),
            Some(BucketVersioningStatus::Suspended) => Some(Versioning { enabled: false }),
            _ => None,
        })
    }

    async fn read_logging(&self, bucket: &str) -> Result<Option<LoggingTarget>, ProviderError> {
        let resp = self
            .client
            .get_bucket_logging()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| ProviderError::ReadFailed(format_err_chain(&e)))?;

        Ok(resp.logging_enabled().map(|logging| LoggingTarget {
            target_bucket: logging.target_bucket().to_string(),
            target_prefix: logging.target_prefix().to_string(),
        }))
    }

    async fn read_encryption(&self, bucket: &str) -> Result<Option<Encryption>, ProviderError> {
        match self
            .client
            .get_bucket_encryption()
            .bucket(bucket)
            .send()
            .await
        {
            Ok(resp) => Ok(resp
                .server_side_encryption_configuration()
                .and_then(|config| config.rules().first())
                .and_then(|rule| rule.apply_server_side_encryption_by_default())
                .and_then(|default| {
                    let algorithm = default.sse_algorithm().as_str().parse::<SseAlgorithm>().ok()?;
                    Some(Encryption {
                        algorithm,
                        kms_master_key_id: default.kms_master_key_id().map(String::from),
                    })
                })),
            Err(e) if service_code(&e) == Some("ServerSideEncryptionConfigurationNotFoundError") => {
                Ok(None)
            }
            Err(e) => Err(ProviderError::ReadFailed(format_err_chain(&e))),
        }
    }

    async fn read_object_lock(
        &self,
        bucket: &str,
    ) -> Result<Option<ObjectLockRetention>, ProviderError> {
        match self
            .client
            .get_object_lock_configuration()
            .bucket(bucket)
            .send()
            .await
        {
            Ok(resp) => Ok(resp
                .object_lock_configuration()
                .filter(|config| {
                    config.object_lock_enabled() == Some(&ObjectLockEnabled::Enabled)
                })
                .and_then(|config| config.rule())
                .and_then(|rule| rule.default_retention())
                .and_then(|retention| {
                    // Years-based retention has no day count to compare.
                    let mode = retention.mode()?.as_str().parse::<ObjectLockMode>().ok()?;
                    let days = u32::try_from(retention.days()?).ok()?;
                    Some(ObjectLockRetention { mode, days })
                })),
            Err(e) if service_code(&e) == Some("ObjectLockConfigurationNotFoundError") => Ok(None),
            Err(e) => Err(ProviderError::ReadFailed(format_err_chain(&e))),
        }
    }

    /// Delete every object version and delete marker so the bucket can go.
    async fn empty_bucket(&self, bucket: &str) -> Result<(), ProviderError> {
        let mut key_marker = None;
        let mut version_id_marker = None;

        loop {
            let resp = match self
                .client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.clone())
                .set_version_id_marker(version_id_marker.clone())
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) if service_code(&e) == Some("NoSuchBucket") => return Ok(()),
                Err(e) => return Err(ProviderError::DeleteFailed(format_err_chain(&e))),
            };

            let versions = resp
                .versions()
                .iter()
                .map(|v| (v.key(), v.version_id()))
                .chain(resp.delete_markers().iter().map(|m| (m.key(), m.version_id())));

            for (key, version_id) in versions {
                let Some(key) = key else { continue };
                self.client
                    .delete_object()
                    .bucket(bucket)
                    .key(key)
                    .set_version_id(version_id.map(String::from))
                    .send()
                    .await
                    .map_err(|e| ProviderError::DeleteFailed(format_err_chain(&e)))?;
            }

            if resp.is_truncated() == Some(true) {
                key_marker = resp.next_key_marker().map(String::from);
                version_id_marker = resp.next_version_id_marker().map(String::from);
            } else {
                break;
            }
        }

        Ok(())
    }
}

impl BucketProvider for S3Provider {
    fn get_bucket_state<'a>(
        &'a self,
        bucket: &'a str,
    ) -> BoxFuture<'a, Result<Option<ObservedState>, ProviderError>> {
        Box::pin(async move {
            match self.client.head_bucket().bucket(bucket).send().await {
                Ok(_) => {}
                Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => {
                    tracing::debug!(bucket = %bucket, "bucket not found");
                    return Ok(None);
                }
                Err(e) => return Err(ProviderError::ReadFailed(format_err_chain(&e))),
            }

            let state = ObservedState {
                bucket: bucket.to_string(),
                exists: true,
                acl: self.read_acl(bucket).await?,
                acl_disabled: self.read_acl_disabled(bucket).await?,
                versioning: self.read_versioning(bucket).await?,
                logging: self.read_logging(bucket).await?,
                encryption: self.read_encryption(bucket).await?,
                object_lock: self.read_object_lock(bucket).await?,
                observed_at: jiff::Timestamp::now(),
            };
            tracing::debug!(bucket = %bucket, "bucket state read");
            Ok(Some(state))
        })
    }

    fn create_bucket<'a>(
        &'a self,
        bucket: &'a str,
        acl: Acl,
    ) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            let mut builder = self.client.create_bucket().bucket(bucket);

            if self.region != "us-east-1" {
                builder = builder.create_bucket_configuration(
                    CreateBucketConfiguration::builder()
                        .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                        .build(),
                );
            }

            // New buckets enforce bucket-owner ownership, which rejects any
            // ACL other than private.
            if acl != Acl::Private {
                builder = builder
                    .acl(BucketCannedAcl::from(acl.as_str()))
                    .object_ownership(ObjectOwnership::ObjectWriter);
            }

            match builder.send().await {
                Ok(_) => {
                    tracing::info!(bucket = %bucket, region = %self.region, "S3 bucket created");
                    Ok(())
                }
                Err(e) => {
                    let result =
                        create_bucket_error(service_code(&e), bucket, acl, format_err_chain(&e));
                    if result.is_ok() {
                        tracing::debug!(bucket = %bucket, "bucket already owned, nothing to create");
                    }
                    result
                }
            }
        })
    }

    fn put_bucket_acl<'a>(
        &'a self,
        bucket: &'a str,
        acl: Acl,
    ) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            match self
                .client
                .put_bucket_acl()
                .bucket(bucket)
                .acl(BucketCannedAcl::from(acl.as_str()))
                .send()
                .await
            {
                Ok(_) => {
                    tracing::info!(bucket = %bucket, acl = %acl, "bucket ACL set");
                    Ok(())
                }
                Err(e) if service_code(&e) == Some("AccessControlListNotSupported") => {
                    Err(ProviderError::Conflict(format!(
                        "ACLs are disabled on {bucket}, cannot set {acl}"
                    )))
                }
                Err(e) => Err(ProviderError::UpdateFailed(format_err_chain(&e))),
            }
        })
    }

    fn put_bucket_versioning<'a>(
        &'a self,
        bucket: &'a str,
        enabled: bool,
    ) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            let status = if enabled {
                BucketVersioningStatus::Enabled
            } else {
                BucketVersioningStatus::Suspended
            };

            self.client
                .put_bucket_versioning()
                .bucket(bucket)
                .versioning_configuration(VersioningConfiguration::builder().status(status).build())
                .send()
                .await
                .map_err(|e| ProviderError::UpdateFailed(format_err_chain(&e)))?;

            tracing::info!(bucket = %bucket, enabled, "bucket versioning set");
            Ok(())
        })
    }

    fn put_bucket_logging<'a>(
        &'a self,
        bucket: &'a str,
        target: &'a LoggingTarget,
    ) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            let logging = LoggingEnabled::builder()
                .target_bucket(&target.target_bucket)
                .target_prefix(&target.target_prefix)
                .build()
                .map_err(|e| ProviderError::UpdateFailed(e.to_string()))?;

            self.client
                .put_bucket_logging()
                .bucket(bucket)
                .bucket_logging_status(BucketLoggingStatus::builder().logging_enabled(logging).build())
                .send()
                .await
                .map_err(|e| ProviderError::UpdateFailed(format_err_chain(&e)))?;

            tracing::info!(
                bucket = %bucket,
                target_bucket = %target.target_bucket,
                target_prefix = %target.target_prefix,
                "bucket access logging set"
            );
            Ok(())
        })
    }

    fn put_bucket_encryption<'a>(
        &'a self,
        bucket: &'a str,
        encryption: &'a Encryption,
    ) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            let default = ServerSideEncryptionByDefault::builder()
                .sse_algorithm(ServerSideEncryption::from(encryption.algorithm.as_str()))
                .set_kms_master_key_id(encryption.kms_master_key_id.clone())
                .build()
                .map_err(|e| ProviderError::UpdateFailed(e.to_string()))?;
            let config = ServerSideEncryptionConfiguration::builder()
                .rules(
                    ServerSideEncryptionRule::builder()
                        .apply_server_side_encryption_by_default(default)
                        .build(),
                )
                .build()
                .map_err(|e| ProviderError::UpdateFailed(e.to_string()))?;

            self.client
                .put_bucket_encryption()
                .bucket(bucket)
                .server_side_encryption_configuration(config)
                .send()
                .await
                .map_err(|e| ProviderError::UpdateFailed(format_err_chain(&e)))?;

            tracing::info!(
                bucket = %bucket,
                algorithm = %encryption.algorithm,
                "bucket default encryption set"
            );
            Ok(())
        })
    }

    fn delete_bucket<'a>(&'a self, bucket: &'a str) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            self.empty_bucket(bucket).await?;

            match self.client.delete_bucket().bucket(bucket).send().await {
                Ok(_) => {
                    tracing::info!(bucket = %bucket, "S3 bucket deleted");
                    Ok(())
                }
                Err(e) if service_code(&e) == Some("NoSuchBucket") => {
                    tracing::debug!(bucket = %bucket, "bucket already gone");
                    Ok(())
                }
                Err(e) => Err(ProviderError::DeleteFailed(format_err_chain(&e))),
            }
        })
    }
}
