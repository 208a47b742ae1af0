use std::future::Future;
use std::pin::Pin;

use crate::error::ProviderError;
use crate::observed::ObservedState;
use crate::spec::{Acl, Encryption, LoggingTarget};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The provider API surface the reconciler drives.
///
/// Every mutating call must be idempotent: repeating a call that already
/// took effect succeeds without changing anything. Methods return boxed
/// futures so the trait stays dyn compatible.
pub trait BucketProvider: Send + Sync {
    /// Read the current state of `bucket`. `None` = doesn't exist.
    fn get_bucket_state<'a>(
        &'a self,
        bucket: &'a str,
    ) -> BoxFuture<'a, Result<Option<ObservedState>, ProviderError>>;

    /// Create an empty bucket with a canned ACL. Succeeds if the caller
    /// already owns it.
    fn create_bucket<'a>(
        &'a self,
        bucket: &'a str,
        acl: Acl,
    ) -> BoxFuture<'a, Result<(), ProviderError>>;

    fn put_bucket_acl<'a>(
        &'a self,
        bucket: &'a str,
        acl: Acl,
    ) -> BoxFuture<'a, Result<(), ProviderError>>;

    fn put_bucket_versioning<'a>(
        &'a self,
        bucket: &'a str,
        enabled: bool,
    ) -> BoxFuture<'a, Result<(), ProviderError>>;

    fn put_bucket_logging<'a>(
        &'a self,
        bucket: &'a str,
        target: &'a LoggingTarget,
    ) -> BoxFuture<'a, Result<(), ProviderError>>;

    fn put_bucket_encryption<'a>(
        &'a self,
        bucket: &'a str,
        encryption: &'a Encryption,
    ) -> BoxFuture<'a, Result<(), ProviderError>>;

    /// Delete the bucket and everything in it. Succeeds if it is already gone.
    fn delete_bucket<'a>(&'a self, bucket: &'a str) -> BoxFuture<'a, Result<(), ProviderError>>;
}
