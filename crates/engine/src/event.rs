//! Observable engine events
//!
//! Published on a broadcast channel after the change they describe has
//! been journaled and applied.

use quorum_core::{ActionId, Owner};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    Submission { id: ActionId },
    Approval { owner: Owner, id: ActionId },
    Revocation { owner: Owner, id: ActionId },
    Execution { id: ActionId },
    /// Dispatch failed and the action was left Proposed
    ExecutionFailure { id: ActionId, reason: String },
    OwnerAddition { owner: Owner },
    OwnerRemoval { owner: Owner },
    OwnerReplacement { old: Owner, new: Owner },
    ThresholdChange { threshold: usize },
}
