use serde::{Deserialize, Serialize};

use crate::error::{ObjectLockMismatch, ReplaceRequired};
use crate::operation::Operation;

/// The ordered operations needed to converge one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub operations: Vec<Operation>,
    /// Set when the plan destroys the bucket and recreates it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub replace: Option<ReplaceRequired>,
    /// Set when the Object Lock retention differs from the declared one.
    /// No operation fixes it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub object_lock: Option<ObjectLockMismatch>,
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        !self.operations.is_empty()
    }

    pub fn is_destructive(&self) -> bool {
        self.replace.is_some() || self.operations.iter().any(Operation::is_destructive)
    }

    /// Refuse a destructive plan the caller has not confirmed.
    pub fn confirm(&self, confirmed: bool) -> Result<(), ReplaceRequired> {
        match &self.replace {
            Some(replace) if !confirmed => Err(replace.clone()),
            _ => Ok(()),
        }
    }
}
