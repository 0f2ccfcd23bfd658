//! Journal records and the state changes they carry

use crate::hash::calculate_record_hash;
use chrono::{DateTime, Utc};
use quorum_core::{Action, ActionId, Owner};
use serde::{Deserialize, Serialize};

/// A single durable state change.
///
/// Threshold clamping after an owner removal is not recorded: replaying
/// `OwnerRemoved` derives it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum StateChange {
    /// Initial owner set and threshold (always sequence 1)
    Genesis { owners: Vec<Owner>, threshold: usize },

    Submitted { action: Action },

    Approved { owner: Owner, id: ActionId },

    Revoked { owner: Owner, id: ActionId },

    /// Written before dispatch. Without a matching outcome record the
    /// action is in doubt after a crash.
    ExecutionStarted { id: ActionId },

    ExecutionConfirmed { id: ActionId },

    ExecutionRolledBack { id: ActionId, reason: String },

    OwnerAdded { owner: Owner },

    OwnerRemoved { owner: Owner },

    OwnerReplaced { old: Owner, new: Owner },

    ThresholdSet { threshold: usize },
}

impl StateChange {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            StateChange::Genesis { .. } => "genesis",
            StateChange::Submitted { .. } => "submitted",
            StateChange::Approved { .. } => "approved",
            StateChange::Revoked { .. } => "revoked",
            StateChange::ExecutionStarted { .. } => "execution_started",
            StateChange::ExecutionConfirmed { .. } => "execution_confirmed",
            StateChange::ExecutionRolledBack { .. } => "execution_rolled_back",
            StateChange::OwnerAdded { .. } => "owner_added",
            StateChange::OwnerRemoved { .. } => "owner_removed",
            StateChange::OwnerReplaced { .. } => "owner_replaced",
            StateChange::ThresholdSet { .. } => "threshold_set",
        }
    }
}

/// One line of the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Strictly increasing, starting at 1
    pub sequence: u64,
    /// Hash of the previous record (`GENESIS` for the first)
    pub prev_hash: String,
    /// SHA-256 over sequence, prev_hash, timestamp and change
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub change: StateChange,
}

impl JournalRecord {
    /// Build a record and compute its hash
    pub fn seal(
        sequence: u64,
        prev_hash: impl Into<String>,
        timestamp: DateTime<Utc>,
        change: StateChange,
    ) -> Result<Self, serde_json::Error> {
        let mut record = Self {
            sequence,
            prev_hash: prev_hash.into(),
            hash: String::new(),
            timestamp,
            change,
        };
        record.hash = calculate_record_hash(&record)?;
        Ok(record)
    }
}
