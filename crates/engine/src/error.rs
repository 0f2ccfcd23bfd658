//! Engine errors

use quorum_core::{ActionId, Owner, OwnerError};
use quorum_journal::JournalError;
use quorum_state::StateError;
use thiserror::Error;

/// Every way an engine operation can be rejected.
///
/// A rejected operation leaves no partial state behind.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unauthorized: {0} is not a current owner")]
    Unauthorized(Owner),

    #[error("Unknown owner: {0}")]
    UnknownOwner(Owner),

    #[error("Duplicate owner: {0}")]
    DuplicateOwner(Owner),

    #[error("Invalid owner: {0}")]
    InvalidOwner(String),

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

    #[error("Action {id} already approved by {owner}")]
    AlreadyApproved { id: ActionId, owner: Owner },

    #[error("Action {id} not approved by {owner}")]
    NotApproved { id: ActionId, owner: Owner },

    #[error("Action {0} already executed")]
    ActionFinalized(ActionId),

    #[error("Quorum not met: {approvals} of {threshold} approvals")]
    QuorumNotMet { approvals: usize, threshold: usize },

    #[error("Dispatch failed for action {id}: {reason}")]
    DispatchFailed { id: ActionId, reason: String },

    #[error("Action id out of sequence: expected {expected}, got {actual}")]
    OutOfSequence { expected: ActionId, actual: ActionId },

    #[error("Action {0} has an unresolved dispatch; reopen the engine to recover it")]
    InDoubt(ActionId),

    #[error("Governance changes require an executed governance action")]
    GovernanceRequiresQuorum,

    #[error("Invalid governance payload: {0}")]
    InvalidGovernancePayload(String),

    #[error("Engine already initialized")]
    AlreadyInitialized,

    #[error("Engine not initialized")]
    NotInitialized,

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("Corrupted journal at sequence {sequence}: {reason}")]
    Corrupted { sequence: u64, reason: String },
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

impl From<StateError> for EngineError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::UnknownOwner(owner) => EngineError::UnknownOwner(owner),
            StateError::DuplicateOwner(owner) => EngineError::DuplicateOwner(owner),
            StateError::InvalidOwner(e) => EngineError::InvalidOwner(e.to_string()),
            StateError::CapacityExceeded { max } => EngineError::CapacityExceeded { max },
            StateError::LastOwner(owner) => EngineError::LastOwner(owner),
            StateError::EmptyOwnerSet => EngineError::EmptyOwnerSet,
            StateError::InvalidThreshold { value, owners } => {
                EngineError::InvalidThreshold { value, owners }
            }
            StateError::UnknownAction(id) => EngineError::UnknownAction(id),
            StateError::AlreadyExecuted(id) => EngineError::ActionFinalized(id),
            StateError::AlreadyApproved { id, owner } => EngineError::AlreadyApproved { id, owner },
            StateError::NotApproved { id, owner } => EngineError::NotApproved { id, owner },
        }
    }
}

impl From<OwnerError> for EngineError {
    fn from(err: OwnerError) -> Self {
        EngineError::InvalidOwner(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_executed_maps_to_finalized() {
        let err: EngineError = StateError::AlreadyExecuted(ActionId(4)).into();
        assert!(matches!(err, EngineError::ActionFinalized(ActionId(4))));
    }

    #[test]
    fn test_quorum_message() {
        let err = EngineError::QuorumNotMet {
            approvals: 1,
            threshold: 2,
        };
        assert_eq!(err.to_string(), "Quorum not met: 1 of 2 approvals");
    }
}
