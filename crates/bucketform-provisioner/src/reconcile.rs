use std::sync::Arc;

use crate::error::{ApplyError, ConfigError, ObjectLockMismatch, ProviderError, ReplaceRequired};
use crate::observed::ObservedState;
use crate::operation::Operation;
use crate::plan::Plan;
use crate::provider::BucketProvider;
use crate::spec::{Acl, ResourceSpec};

/// Compare a declared bucket against what the provider reports and produce
/// the operations that converge them.
///
/// Pure: never talks to the provider. Updates come out in a fixed order
/// (ACL, versioning, logging, encryption) so identical inputs always yield
/// identical plans.
pub fn plan(spec: &ResourceSpec, observed: Option<&ObservedState>) -> Result<Plan, ConfigError> {
    spec.validate()?;

    let observed = observed.filter(|o| o.exists);
    let object_lock = object_lock_mismatch(spec, observed);

    let observed = match observed {
        Some(observed) => observed,
        None => {
            return Ok(Plan {
                operations: vec![Operation::Create(spec.clone())],
                replace: None,
                object_lock,
            });
        }
    };

    // The bucket name is immutable: a rename destroys and recreates.
    if observed.bucket != spec.bucket {
        return Ok(Plan {
            operations: vec![
                Operation::Delete {
                    bucket: observed.bucket.clone(),
                },
                Operation::Create(spec.clone()),
            ],
            replace: Some(ReplaceRequired {
                from: observed.bucket.clone(),
                to: spec.bucket.clone(),
            }),
            object_lock,
        });
    }

    Ok(Plan {
        operations: updates(spec, observed)?,
        replace: None,
        object_lock,
    })
}

/// One update per declared field that differs, in plan order.
fn updates(spec: &ResourceSpec, observed: &ObservedState) -> Result<Vec<Operation>, ConfigError> {
    let bucket = &spec.bucket;
    let mut operations = Vec::new();

    if observed.acl_disabled {
        if spec.acl != Acl::Private {
            return Err(ConfigError::AclDisabled {
                bucket: bucket.clone(),
                acl: spec.acl.to_string(),
            });
        }
    } else if observed.acl != Some(spec.acl) {
        operations.push(Operation::UpdateAcl {
            bucket: bucket.clone(),
            acl: spec.acl,
        });
    }

    if let Some(versioning) = spec.versioning {
        if observed.versioning_enabled() != versioning.enabled {
            operations.push(Operation::UpdateVersioning {
                bucket: bucket.clone(),
                enabled: versioning.enabled,
            });
        }
    }

    if let Some(target) = &spec.logging {
        if observed.logging.as_ref() != Some(target) {
            operations.push(Operation::UpdateLogging {
                bucket: bucket.clone(),
                target: target.clone(),
            });
        }
    }

    if let Some(encryption) = &spec.encryption {
        if observed.encryption.as_ref() != Some(encryption) {
            operations.push(Operation::UpdateEncryption {
                bucket: bucket.clone(),
                encryption: encryption.clone(),
            });
        }
    }

    Ok(operations)
}

/// A declared retention checked against the bucket the spec names. A
/// bucket that is missing or about to be replaced has no lock yet.
fn object_lock_mismatch(
    spec: &ResourceSpec,
    observed: Option<&ObservedState>,
) -> Option<ObjectLockMismatch> {
    let declared = spec.object_lock?;
    let found = observed
        .filter(|o| o.bucket == spec.bucket)
        .and_then(|o| o.object_lock);

    (found != Some(declared)).then(|| ObjectLockMismatch {
        bucket: spec.bucket.clone(),
        declared,
        observed: found,
    })
}

/// Drives one bucket toward its declared state through a [`BucketProvider`].
///
/// Assumes exclusive ownership of the bucket while applying. Retries are the
/// caller's business.
#[derive(Clone)]
pub struct Reconciler {
    provider: Arc<dyn BucketProvider>,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn BucketProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &dyn BucketProvider {
        self.provider.as_ref()
    }

    /// Fetch the current state of `bucket`.
    pub async fn observe(&self, bucket: &str) -> Result<Option<ObservedState>, ProviderError> {
        self.provider
            .get_bucket_state(bucket)
            .await
            .map_err(|e| e.with_bucket(bucket))
    }

    pub fn plan(
        &self,
        spec: &ResourceSpec,
        observed: Option<&ObservedState>,
    ) -> Result<Plan, ConfigError> {
        plan(spec, observed)
    }

    /// Apply `operations` in order, stopping at the first failure.
    ///
    /// `observed` is the state the operations were planned against. Returns
    /// the resulting state, `None` when the sequence leaves no bucket behind.
    pub async fn apply(
        &self,
        observed: Option<ObservedState>,
        operations: &[Operation],
    ) -> Result<Option<ObservedState>, ApplyError> {
        let provider = self.provider.as_ref();
        let mut state = observed;

        for (index, operation) in operations.iter().enumerate() {
            tracing::info!(
                bucket = %operation.bucket(),
                step = index + 1,
                total = operations.len(),
                "{operation}"
            );

            let result = match operation {
                Operation::Create(spec) => create(provider, spec).await.map(Some),
                Operation::Delete { bucket } => provider.delete_bucket(bucket).await.map(|()| None),
                update => put(provider, update).await.map(|()| {
                    state.clone().map(|mut s| {
                        update.fold_update(&mut s);
                        s
                    })
                }),
            };

            match result {
                Ok(next) => state = next,
                Err(source) => {
                    let source = source.with_bucket(operation.bucket());
                    tracing::warn!(
                        bucket = %operation.bucket(),
                        completed = index,
                        error = %source,
                        "operation failed, stopping apply"
                    );
                    return Err(ApplyError {
                        index,
                        completed: operations[..index].to_vec(),
                        failed: operation.clone(),
                        unattempted: operations[index + 1..].to_vec(),
                        state,
                        source,
                    });
                }
            }
        }

        if let Some(state) = state.as_mut() {
            state.observed_at = jiff::Timestamp::now();
        }
        Ok(state)
    }
}

/// The single provider call behind an operation. For `Create` that is the
/// bare `CreateBucket`; [`create`] does the rest.
async fn put(provider: &dyn BucketProvider, operation: &Operation) -> Result<(), ProviderError> {
    match operation {
        Operation::Create(spec) => provider.create_bucket(&spec.bucket, spec.acl).await,
        Operation::Delete { bucket } => provider.delete_bucket(bucket).await,
        Operation::UpdateAcl { bucket, acl } => provider.put_bucket_acl(bucket, *acl).await,
        Operation::UpdateVersioning { bucket, enabled } => {
            provider.put_bucket_versioning(bucket, *enabled).await
        }
        Operation::UpdateLogging { bucket, target } => {
            provider.put_bucket_logging(bucket, target).await
        }
        Operation::UpdateEncryption { bucket, encryption } => {
            provider.put_bucket_encryption(bucket, encryption).await
        }
    }
}

/// Create the bucket, read it back, then set each declared block that
/// differs, in plan order.
///
/// `CreateBucket` succeeds on a bucket the caller already owns without
/// touching its settings, so the read-back decides what is left to do.
async fn create(
    provider: &dyn BucketProvider,
    spec: &ResourceSpec,
) -> Result<ObservedState, ProviderError> {
    put(provider, &Operation::Create(spec.clone())).await?;

    let mut state = provider
        .get_bucket_state(&spec.bucket)
        .await?
        .ok_or_else(|| ProviderError::CreateFailed("bucket missing after CreateBucket".into()))?;

    let remaining = updates(spec, &state).map_err(|e| ProviderError::Conflict(e.to_string()))?;
    for update in &remaining {
        tracing::debug!(bucket = %spec.bucket, "{update}");
        put(provider, update).await?;
        update.fold_update(&mut state);
    }

    Ok(state)
}
