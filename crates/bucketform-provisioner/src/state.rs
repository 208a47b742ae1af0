use serde::{Deserialize, Serialize};

use crate::error::ApplyError;
use crate::observed::ObservedState;
use crate::operation::Operation;

/// Provisioner state, persisted between runs.
///
/// Records which bucket this declaration manages so that a rename can be
/// detected, plus the last state seen after an apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionerState {
    /// Name of the managed bucket as last recorded. `None` = nothing managed.
    pub bucket: Option<String>,
    pub status: Option<ResourceStatus>,
    pub last_observed: Option<ObservedState>,
    pub updated_at: Option<jiff::Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Created,
    Updated,
    Replaced,
    InSync,
    /// An apply stopped part way; the next run completes it.
    Partial,
}

impl ProvisionerState {
    /// Remember `observed` as the current state of the managed bucket.
    pub fn record(&mut self, observed: Option<ObservedState>, status: ResourceStatus) {
        self.bucket = observed.as_ref().map(|o| o.bucket.clone());
        self.last_observed = observed;
        self.status = Some(status);
        self.updated_at = Some(jiff::Timestamp::now());
    }

    /// Remember where an interrupted apply left off.
    ///
    /// Without a state to record, the name kept is the bucket a `Create`
    /// may already have made, else the previously recorded bucket unless
    /// this run deleted it. Destroy and the next plan look the bucket up
    /// under that name.
    pub fn record_partial(&mut self, err: &ApplyError) {
        let previous = self.bucket.take();
        self.record(err.state.clone(), ResourceStatus::Partial);

        if self.bucket.is_none() {
            let deleted = |name: &str| {
                err.completed
                    .iter()
                    .any(|op| matches!(op, Operation::Delete { bucket } if bucket == name))
            };
            self.bucket = err
                .attempted_create()
                .map(String::from)
                .or_else(|| previous.filter(|name| !deleted(name.as_str())));
        }
    }

    pub fn clear(&mut self) {
        *self = Self {
            updated_at: Some(jiff::Timestamp::now()),
            ..Self::default()
        };
    }
}
