//! Governance - owner-set and threshold changes
//!
//! Changes reach the engine two ways:
//! - directly, by a single current owner (`GovernanceMode::Unilateral`)
//! - as an ordinary action targeting [`GOVERNANCE_TARGET`], which must
//!   reach quorum like any other action. The engine applies it itself on
//!   execute instead of handing it to the dispatcher.

use crate::engine::ApprovalEngine;
use crate::error::{EngineError, EngineResult};
use quorum_core::{ActionDescriptor, ActionId, Amount, Owner};
use quorum_journal::StateChange;
use serde::{Deserialize, Serialize};

/// Target of actions that change governance
pub const GOVERNANCE_TARGET: &str = "quorum:governance";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GovernanceCall {
    AddOwner { owner: Owner },
    RemoveOwner { owner: Owner },
    ReplaceOwner { old: Owner, new: Owner },
    SetThreshold { threshold: usize },
}

impl GovernanceCall {
    /// The journaled change this call produces
    pub fn to_change(&self) -> StateChange {
        match self.clone() {
            GovernanceCall::AddOwner { owner } => StateChange::OwnerAdded { owner },
            GovernanceCall::RemoveOwner { owner } => StateChange::OwnerRemoved { owner },
            GovernanceCall::ReplaceOwner { old, new } => StateChange::OwnerReplaced { old, new },
            GovernanceCall::SetThreshold { threshold } => StateChange::ThresholdSet { threshold },
        }
    }

    pub fn encode(&self) -> EngineResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| EngineError::InvalidGovernancePayload(e.to_string()))
    }

    pub fn decode(payload: &[u8]) -> EngineResult<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| EngineError::InvalidGovernancePayload(e.to_string()))
    }

    /// Action descriptor that carries this call through the quorum pipeline
    pub fn descriptor(&self) -> EngineResult<ActionDescriptor> {
        Ok(ActionDescriptor::new(
            GOVERNANCE_TARGET,
            Amount::ZERO,
            self.encode()?,
        ))
    }
}

/// Governance operations on top of an [`ApprovalEngine`]
pub struct GovernanceActions<'a> {
    engine: &'a ApprovalEngine,
}

impl<'a> GovernanceActions<'a> {
    pub fn new(engine: &'a ApprovalEngine) -> Self {
        Self { engine }
    }

    pub async fn add_owner(&self, caller: &Owner, owner: Owner) -> EngineResult<()> {
        self.engine
            .govern(caller, GovernanceCall::AddOwner { owner })
            .await
    }

    pub async fn remove_owner(&self, caller: &Owner, owner: Owner) -> EngineResult<()> {
        self.engine
            .govern(caller, GovernanceCall::RemoveOwner { owner })
            .await
    }

    pub async fn replace_owner(&self, caller: &Owner, old: Owner, new: Owner) -> EngineResult<()> {
        self.engine
            .govern(caller, GovernanceCall::ReplaceOwner { old, new })
            .await
    }

    pub async fn set_threshold(&self, caller: &Owner, threshold: usize) -> EngineResult<()> {
        self.engine
            .govern(caller, GovernanceCall::SetThreshold { threshold })
            .await
    }

    /// Submit `call` as an action; it takes effect when executed at quorum.
    pub async fn propose(&self, caller: &Owner, call: GovernanceCall) -> EngineResult<ActionId> {
        self.engine.submit(caller, call.descriptor()?).await
    }
}
