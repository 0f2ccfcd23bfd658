//! State component errors

use quorum_core::{ActionId, Owner, OwnerError};
use thiserror::Error;

/// Invariant violations reported by the state components
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Unknown owner: {0}")]
    UnknownOwner(Owner),

    #[error("Duplicate owner: {0}")]
    DuplicateOwner(Owner),

    #[error("Invalid owner: {0}")]
    InvalidOwner(#[from] OwnerError),

    #[error("Owner capacity exceeded (max {max})")]
    CapacityExceeded { max: usize },

    #[error("Cannot remove {0}: it is the last owner")]
    LastOwner(Owner),

    #[error("Owner set cannot be empty")]
    EmptyOwnerSet,

    #[error("Invalid threshold {value}: must be between 1 and {owners}")]
    InvalidThreshold { value: usize, owners: usize },

    #[error("Unknown action: {0}")]
    UnknownAction(ActionId),

    #[error("Action {0} already executed")]
    AlreadyExecuted(ActionId),

    #[error("Action {id} already approved by {owner}")]
    AlreadyApproved { id: ActionId, owner: Owner },

    #[error("Action {id} not approved by {owner}")]
    NotApproved { id: ActionId, owner: Owner },
}
