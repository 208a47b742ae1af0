use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::ProviderError;
use crate::observed::ObservedState;
use crate::provider::{BoxFuture, BucketProvider};
use crate::spec::{Acl, Encryption, LoggingTarget, Versioning};

/// Names of the provider API calls, used for call logs and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderCall {
    GetBucketState,
    CreateBucket,
    PutBucketAcl,
    PutBucketVersioning,
    PutBucketLogging,
    PutBucketEncryption,
    DeleteBucket,
}

impl fmt::Display for ProviderCall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ProviderCall::GetBucketState => "GetBucketState",
            ProviderCall::CreateBucket => "CreateBucket",
            ProviderCall::PutBucketAcl => "PutBucketAcl",
            ProviderCall::PutBucketVersioning => "PutBucketVersioning",
            ProviderCall::PutBucketLogging => "PutBucketLogging",
            ProviderCall::PutBucketEncryption => "PutBucketEncryption",
            ProviderCall::DeleteBucket => "DeleteBucket",
        };
        f.write_str(name)
    }
}

/// When an injected fault fires relative to the change it interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The call fails and nothing changes.
    Reject,
    /// The change lands, then the call reports failure (a timeout after the
    /// provider already applied it).
    AfterApply,
}

#[derive(Default)]
struct Inner {
    buckets: BTreeMap<String, ObservedState>,
    calls: Vec<ProviderCall>,
    faults: HashMap<ProviderCall, Fault>,
}

/// In-process provider keeping buckets in memory.
///
/// Behaves like an idempotent PUT-style API and records every call. Used for
/// local dry runs and tests.
#[derive(Default)]
pub struct MemoryProvider {
    inner: Mutex<Inner>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a bucket as if it already existed remotely.
    pub fn insert(&self, state: ObservedState) {
        self.lock().buckets.insert(state.bucket.clone(), state);
    }

    pub fn bucket(&self, name: &str) -> Option<ObservedState> {
        self.lock().buckets.get(name).cloned()
    }

    pub fn bucket_names(&self) -> Vec<String> {
        self.lock().buckets.keys().cloned().collect()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make the next `call` fail. One-shot: later calls succeed.
    pub fn fail_next(&self, call: ProviderCall, fault: Fault) {
        self.lock().faults.insert(call, fault);
    }

    /// Switch a bucket to bucket-owner-enforced ownership.
    pub fn disable_acls(&self, name: &str) {
        if let Some(state) = self.lock().buckets.get_mut(name) {
            state.acl_disabled = true;
            state.acl = Some(Acl::Private);
        }
    }

    /// Record `call`, apply `change` unless a fault rejects it, and report.
    fn run<F>(&self, call: ProviderCall, bucket: &str, change: F) -> Result<(), ProviderError>
    where
        F: FnOnce(&mut BTreeMap<String, ObservedState>) -> Result<(), ProviderError>,
    {
        let mut inner = self.lock();
        inner.calls.push(call);

        match inner.faults.remove(&call) {
            Some(Fault::Reject) => Err(injected(call, bucket)),
            Some(Fault::AfterApply) => {
                change(&mut inner.buckets)?;
                Err(injected(call, bucket))
            }
            None => change(&mut inner.buckets),
        }
    }

    fn update<F>(&self, call: ProviderCall, bucket: &str, edit: F) -> Result<(), ProviderError>
    where
        F: FnOnce(&mut ObservedState),
    {
        self.run(call, bucket, |buckets| {
            let state = buckets
                .get_mut(bucket)
                .ok_or_else(|| ProviderError::UpdateFailed("NoSuchBucket".into()))?;
            edit(state);
            Ok(())
        })
    }
}

fn injected(call: ProviderCall, bucket: &str) -> ProviderError {
    let msg = format!("injected {call} failure for {bucket}");
    match call {
        ProviderCall::GetBucketState => ProviderError::ReadFailed(msg),
        ProviderCall::CreateBucket => ProviderError::CreateFailed(msg),
        ProviderCall::DeleteBucket => ProviderError::DeleteFailed(msg),
        _ => ProviderError::UpdateFailed(msg),
    }
}

impl BucketProvider for MemoryProvider {
    fn get_bucket_state<'a>(
        &'a self,
        bucket: &'a str,
    ) -> BoxFuture<'a, Result<Option<ObservedState>, ProviderError>> {
        Box::pin(async move {
            let mut found = None;
            self.run(ProviderCall::GetBucketState, bucket, |buckets| {
                found = buckets.get(bucket).cloned();
                Ok(())
            })?;
            Ok(found.map(|mut state| {
                state.observed_at = jiff::Timestamp::now();
                state
            }))
        })
    }

    fn create_bucket<'a>(
        &'a self,
        bucket: &'a str,
        acl: Acl,
    ) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            self.run(ProviderCall::CreateBucket, bucket, |buckets| {
                buckets.entry(bucket.to_string()).or_insert_with(|| ObservedState {
                    bucket: bucket.to_string(),
                    exists: true,
                    acl: Some(acl),
                    acl_disabled: false,
                    versioning: None,
                    logging: None,
                    encryption: None,
                    object_lock: None,
                    observed_at: jiff::Timestamp::now(),
                });
                Ok(())
            })
        })
    }

    fn put_bucket_acl<'a>(
        &'a self,
        bucket: &'a str,
        acl: Acl,
    ) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            self.update(ProviderCall::PutBucketAcl, bucket, |state| {
                state.acl = Some(acl);
            })
        })
    }

    fn put_bucket_versioning<'a>(
        &'a self,
        bucket: &'a str,
        enabled: bool,
    ) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            self.update(ProviderCall::PutBucketVersioning, bucket, |state| {
                state.versioning = Some(Versioning { enabled });
            })
        })
    }

    fn put_bucket_logging<'a>(
        &'a self,
        bucket: &'a str,
        target: &'a LoggingTarget,
    ) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            self.update(ProviderCall::PutBucketLogging, bucket, |state| {
                state.logging = Some(target.clone());
            })
        })
    }

    fn put_bucket_encryption<'a>(
        &'a self,
        bucket: &'a str,
        encryption: &'a Encryption,
    ) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            self.update(ProviderCall::PutBucketEncryption, bucket, |state| {
                state.encryption = Some(encryption.clone());
            })
        })
    }

    fn delete_bucket<'a>(&'a self, bucket: &'a str) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            self.run(ProviderCall::DeleteBucket, bucket, |buckets| {
                buckets.remove(bucket);
                Ok(())
            })
        })
    }
}
