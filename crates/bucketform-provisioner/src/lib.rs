//! bucketform-provisioner
//!
//! Desired-state reconciler for a single S3 bucket.
//!
//! Public API:
//! - `plan()` — compare a declared `ResourceSpec` against observed state,
//!   produce an ordered list of operations
//! - `Reconciler::apply()` — run those operations in order, stopping at the
//!   first failure
//! - `provision()` — convenience: observe → plan → apply, persisting state
//! - `destroy()` — delete the managed bucket
//! - `render::terraform()` — render the declaration as HCL
//!
//! Object Lock retention is verified, never changed: a mismatch is carried
//! on the plan and returned by `provision()` as `ObjectLockMismatch`.

pub mod config;
pub mod declaration;
pub mod error;
pub mod observed;
pub mod operation;
pub mod orchestrate;
pub mod persistence;
pub mod plan;
pub mod provider;
pub mod providers;
pub mod reconcile;
pub mod render;
pub mod spec;
pub mod state;

pub use crate::config::{CredentialSource, ProviderConfig};
pub use crate::declaration::BucketDeclaration;
pub use crate::error::{
    ApplyError, ConfigError, ObjectLockMismatch, ProviderError, ReconcileError, ReplaceRequired,
};
pub use crate::observed::ObservedState;
pub use crate::operation::Operation;
pub use crate::orchestrate::{destroy, preview, provision, Preview};
pub use crate::persistence::StatePersistence;
pub use crate::plan::Plan;
pub use crate::provider::{BoxFuture, BucketProvider};
pub use crate::reconcile::{plan, Reconciler};
pub use crate::spec::{
    Acl, Encryption, LoggingTarget, ObjectLockMode, ObjectLockRetention, ResourceSpec, SseAlgorithm,
    Versioning,
};
pub use crate::state::{ProvisionerState, ResourceStatus};
