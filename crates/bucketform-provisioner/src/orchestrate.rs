use crate::error::ReconcileError;
use crate::observed::ObservedState;
use crate::operation::Operation;
use crate::persistence::StatePersistence;
use crate::plan::Plan;
use crate::reconcile::Reconciler;
use crate::spec::ResourceSpec;
use crate::state::{ProvisionerState, ResourceStatus};

/// What a provisioning run would do, computed without side effects.
#[derive(Debug, Clone)]
pub struct Preview {
    /// Bucket name the observation was made against.
    pub recorded_bucket: String,
    pub observed: Option<ObservedState>,
    pub plan: Plan,
}

/// Observe the managed bucket and plan against `spec`.
///
/// Looks the bucket up under the name recorded in `state`, so a renamed
/// declaration is planned as a replace. Without a recorded name the
/// declared one is used.
pub async fn preview(
    reconciler: &Reconciler,
    state: &ProvisionerState,
    spec: &ResourceSpec,
) -> Result<Preview, ReconcileError> {
    // Reject a bad declaration before any provider call.
    spec.validate()?;

    let recorded_bucket = state.bucket.clone().unwrap_or_else(|| spec.bucket.clone());
    let observed = reconciler.observe(&recorded_bucket).await?;
    let plan = reconciler.plan(spec, observed.as_ref())?;

    Ok(Preview {
        recorded_bucket,
        observed,
        plan,
    })
}

/// Full provisioning: observe → plan → apply, persisting the outcome.
///
/// A destructive plan is refused with `ReplaceRequired` unless
/// `confirm_replace` is set. When apply stops part way, the state reached
/// so far is persisted before the error is returned so the next run picks
/// up from there. An Object Lock mismatch does not stop the other fields
/// from converging; it is returned as an error once they have.
pub async fn provision(
    reconciler: &Reconciler,
    persistence: &StatePersistence,
    spec: &ResourceSpec,
    confirm_replace: bool,
) -> Result<ObservedState, ReconcileError> {
    let mut state = persistence.load().await?;
    let Preview { observed, plan, .. } = preview(reconciler, &state, spec).await?;

    if let Some(mismatch) = &plan.object_lock {
        tracing::error!(bucket = %spec.bucket, "{mismatch}");
    }

    if !plan.has_changes() {
        tracing::info!(bucket = %spec.bucket, "bucket in sync, no changes needed");
        state.record(observed.clone(), ResourceStatus::InSync);
        persistence.flush(&state).await?;
        let observed = observed
            .ok_or_else(|| ReconcileError::State("empty plan for a missing bucket".into()))?;
        return match plan.object_lock {
            Some(mismatch) => Err(mismatch.into()),
            None => Ok(observed),
        };
    }

    plan.confirm(confirm_replace)?;

    let status = match (&observed, &plan.replace) {
        (_, Some(_)) => ResourceStatus::Replaced,
        (Some(o), None) if o.exists => ResourceStatus::Updated,
        _ => ResourceStatus::Created,
    };

    tracing::info!(
        bucket = %spec.bucket,
        operations = plan.operations.len(),
        destructive = plan.is_destructive(),
        "executing provisioning plan"
    );

    match reconciler.apply(observed, &plan.operations).await {
        Ok(new_state) => {
            state.record(new_state.clone(), status);
            persistence.flush(&state).await?;
            let new_state = new_state
                .ok_or_else(|| ReconcileError::State("apply left no bucket behind".into()))?;
            match plan.object_lock {
                Some(mismatch) => Err(mismatch.into()),
                None => Ok(new_state),
            }
        }
        Err(err) => {
            state.record_partial(&err);
            persistence.flush(&state).await?;
            Err(Box::new(err).into())
        }
    }
}

/// Destroy the managed bucket and forget it.
pub async fn destroy(
    reconciler: &Reconciler,
    persistence: &StatePersistence,
) -> Result<(), ReconcileError> {
    let mut state = persistence.load().await?;

    if let Some(bucket) = state.bucket.clone() {
        tracing::info!(bucket = %bucket, "destroying bucket");
        let delete = [Operation::Delete { bucket }];
        if let Err(err) = reconciler.apply(state.last_observed.take(), &delete).await {
            return Err(Box::new(err).into());
        }
    } else {
        tracing::info!("no managed bucket recorded, nothing to destroy");
    }

    state.clear();
    persistence.flush(&state).await?;

    Ok(())
}
