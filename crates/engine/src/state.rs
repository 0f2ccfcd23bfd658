//! Engine state - the four components and the rules that tie them together
//!
//! Every journaled `StateChange` is validated by `check` and applied by
//! `apply`. The live engine and journal replay go through the same two
//! functions, so a replayed state is identical to the one that wrote it.

use crate::error::{EngineError, EngineResult};
use crate::event::EngineEvent;
use crate::governance::{GovernanceCall, GOVERNANCE_TARGET};
use quorum_core::{Action, ActionId, ActionStatus, Owner};
use quorum_journal::{JournalRecord, StateChange};
use quorum_state::{ActionLedger, ApprovalMatrix, OwnerRegistry, ThresholdPolicy};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct EngineState {
    registry: OwnerRegistry,
    threshold: ThresholdPolicy,
    ledger: ActionLedger,
    matrix: ApprovalMatrix,
    /// Actions whose dispatch started without a recorded outcome
    in_doubt: BTreeSet<ActionId>,
}

impl EngineState {
    /// Initial state from the Genesis owner set and threshold
    pub fn genesis(owners: Vec<Owner>, threshold: usize) -> EngineResult<Self> {
        let registry = OwnerRegistry::new(owners)?;
        let threshold = ThresholdPolicy::new(threshold, registry.count())?;
        Ok(Self {
            registry,
            threshold,
            ledger: ActionLedger::new(),
            matrix: ApprovalMatrix::new(),
            in_doubt: BTreeSet::new(),
        })
    }

    /// Rebuild state from a full journal (first record must be Genesis)
    pub fn replay(records: &[JournalRecord]) -> EngineResult<Self> {
        let (first, rest) = records.split_first().ok_or(EngineError::NotInitialized)?;

        let mut state = match &first.change {
            StateChange::Genesis { owners, threshold } => Self::genesis(owners.clone(), *threshold)
                .map_err(|e| corrupted(first, e))?,
            other => {
                return Err(EngineError::Corrupted {
                    sequence: first.sequence,
                    reason: format!("expected genesis, found {}", other.kind()),
                })
            }
        };

        for record in rest {
            state
                .apply(record.change.clone())
                .map_err(|e| corrupted(record, e))?;
        }

        tracing::debug!(
            records = records.len(),
            actions = state.ledger.len(),
            owners = state.registry.count(),
            "Journal replayed"
        );
        Ok(state)
    }

    pub fn owners(&self) -> Vec<Owner> {
        self.registry.members()
    }

    pub fn is_owner(&self, owner: &Owner) -> bool {
        self.registry.contains(owner)
    }

    pub fn threshold(&self) -> usize {
        self.threshold.get()
    }

    pub fn ledger(&self) -> &ActionLedger {
        &self.ledger
    }

    pub fn action(&self, id: ActionId) -> EngineResult<&Action> {
        Ok(self.ledger.get(id)?)
    }

    pub fn in_doubt(&self) -> &BTreeSet<ActionId> {
        &self.in_doubt
    }

    /// Approvals for `id` counted against the current owner set
    pub fn approval_count(&self, id: ActionId) -> EngineResult<usize> {
        self.ledger.get(id)?;
        Ok(self.matrix.count_approvals(id, self.registry.as_slice()))
    }

    pub fn approvers(&self, id: ActionId) -> EngineResult<Vec<Owner>> {
        self.ledger.get(id)?;
        Ok(self.matrix.approvers(id, self.registry.as_slice()))
    }

    pub fn is_approved(&self, id: ActionId, owner: &Owner) -> EngineResult<bool> {
        self.ledger.get(id)?;
        Ok(self.matrix.is_approved(id, owner))
    }

    /// Derived, never stored: recomputed from the live owner set each call
    pub fn is_quorum_met(&self, id: ActionId) -> EngineResult<bool> {
        Ok(self.approval_count(id)? >= self.threshold.get())
    }

    /// Validate a change against the current state without applying it
    pub fn check(&self, change: &StateChange) -> EngineResult<()> {
        match change {
            StateChange::Genesis { .. } => Err(EngineError::AlreadyInitialized),
            StateChange::Submitted { action } => {
                let expected = self.ledger.next_id();
                if action.id != expected {
                    return Err(EngineError::OutOfSequence {
                        expected,
                        actual: action.id,
                    });
                }
                if action.status != ActionStatus::Proposed {
                    return Err(EngineError::ActionFinalized(action.id));
                }
                if !self.registry.contains(&action.submitted_by) {
                    return Err(EngineError::Unauthorized(action.submitted_by.clone()));
                }
                if action.target == GOVERNANCE_TARGET {
                    GovernanceCall::decode(&action.payload)?;
                }
                Ok(())
            }
            StateChange::Approved { owner, id } => {
                self.check_open(*id)?;
                Ok(self.matrix.check_set_approval(*id, owner, true)?)
            }
            StateChange::Revoked { owner, id } => {
                self.check_open(*id)?;
                Ok(self.matrix.check_set_approval(*id, owner, false)?)
            }
            StateChange::ExecutionStarted { id } => self.check_open(*id),
            StateChange::ExecutionConfirmed { id } => {
                self.ledger.check_mark_executed(*id)?;
                match self.governance_call(*id)? {
                    Some(call) => self.check(&call.to_change()),
                    None => Ok(()),
                }
            }
            StateChange::ExecutionRolledBack { id, .. } => {
                Ok(self.ledger.check_mark_executed(*id)?)
            }
            StateChange::OwnerAdded { owner } => Ok(self.registry.check_add(owner)?),
            StateChange::OwnerRemoved { owner } => {
                self.registry.check_remove(owner)?;
                Ok(())
            }
            StateChange::OwnerReplaced { old, new } => {
                self.registry.check_replace(old, new)?;
                Ok(())
            }
            StateChange::ThresholdSet { threshold } => {
                Ok(ThresholdPolicy::check(*threshold, self.registry.count())?)
            }
        }
    }

    /// Apply a change, returning the observable events it produced.
    ///
    /// Validates first; a rejected change leaves the state untouched.
    pub fn apply(&mut self, change: StateChange) -> EngineResult<Vec<EngineEvent>> {
        self.check(&change)?;

        let events = match change {
            StateChange::Genesis { .. } => return Err(EngineError::AlreadyInitialized),
            StateChange::Submitted { action } => {
                let descriptor = action.descriptor();
                let id = self
                    .ledger
                    .propose(descriptor, action.submitted_by, action.submitted_at);
                vec![EngineEvent::Submission { id }]
            }
            StateChange::Approved { owner, id } => {
                self.matrix.set_approval(id, &owner, true)?;
                vec![EngineEvent::Approval { owner, id }]
            }
            StateChange::Revoked { owner, id } => {
                self.matrix.set_approval(id, &owner, false)?;
                vec![EngineEvent::Revocation { owner, id }]
            }
            StateChange::ExecutionStarted { id } => {
                self.in_doubt.insert(id);
                Vec::new()
            }
            StateChange::ExecutionConfirmed { id } => {
                let mut events = match self.governance_call(id)? {
                    Some(call) => self.apply(call.to_change())?,
                    None => Vec::new(),
                };
                self.in_doubt.remove(&id);
                self.ledger.mark_executed(id)?;
                events.push(EngineEvent::Execution { id });
                events
            }
            StateChange::ExecutionRolledBack { id, reason } => {
                self.in_doubt.remove(&id);
                vec![EngineEvent::ExecutionFailure { id, reason }]
            }
            StateChange::OwnerAdded { owner } => {
                self.registry.add(owner.clone())?;
                vec![EngineEvent::OwnerAddition { owner }]
            }
            StateChange::OwnerRemoved { owner } => {
                let remaining = self.registry.remove(&owner)?;
                let mut events = vec![EngineEvent::OwnerRemoval { owner }];
                if let Some(threshold) = self.threshold.clamp_to(remaining) {
                    tracing::warn!(threshold, "Threshold clamped to owner count");
                    events.push(EngineEvent::ThresholdChange { threshold });
                }
                events
            }
            StateChange::OwnerReplaced { old, new } => {
                self.registry.replace(&old, new.clone())?;
                vec![EngineEvent::OwnerReplacement { old, new }]
            }
            StateChange::ThresholdSet { threshold } => {
                self.threshold.set(threshold, self.registry.count())?;
                vec![EngineEvent::ThresholdChange { threshold }]
            }
        };

        Ok(events)
    }

    /// The action exists, is not executed and has no dispatch in flight
    fn check_open(&self, id: ActionId) -> EngineResult<()> {
        self.ledger.check_mark_executed(id)?;
        if self.in_doubt.contains(&id) {
            return Err(EngineError::InDoubt(id));
        }
        Ok(())
    }

    fn governance_call(&self, id: ActionId) -> EngineResult<Option<GovernanceCall>> {
        let action = self.ledger.get(id)?;
        if action.target != GOVERNANCE_TARGET {
            return Ok(None);
        }
        GovernanceCall::decode(&action.payload).map(Some)
    }
}

fn corrupted(record: &JournalRecord, err: EngineError) -> EngineError {
    EngineError::Corrupted {
        sequence: record.sequence,
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quorum_core::ActionDescriptor;

    fn owner(id: &str) -> Owner {
        Owner::new(id).unwrap()
    }

    fn state(ids: &[&str], threshold: usize) -> EngineState {
        EngineState::genesis(ids.iter().map(|id| owner(id)).collect(), threshold).unwrap()
    }

    fn submitted(state: &EngineState, by: &str, descriptor: ActionDescriptor) -> StateChange {
        StateChange::Submitted {
            action: Action::proposed(state.ledger().next_id(), descriptor, owner(by), Utc::now()),
        }
    }

    #[test]
    fn test_genesis_validates() {
        assert!(matches!(
            EngineState::genesis(vec![], 1),
            Err(EngineError::EmptyOwnerSet)
        ));
        assert!(matches!(
            EngineState::genesis(vec![owner("a")], 2),
            Err(EngineError::InvalidThreshold { value: 2, owners: 1 })
        ));
    }

    #[test]
    fn test_remove_clamps_threshold() {
        let mut s = state(&["a", "b", "c"], 3);
        let events = s.apply(StateChange::OwnerRemoved { owner: owner("c") }).unwrap();
        assert_eq!(
            events,
            vec![
                EngineEvent::OwnerRemoval { owner: owner("c") },
                EngineEvent::ThresholdChange { threshold: 2 },
            ]
        );
        assert_eq!(s.threshold(), 2);
    }

    #[test]
    fn test_remove_below_threshold_keeps_it() {
        let mut s = state(&["a", "b", "c", "d"], 2);
        let events = s.apply(StateChange::OwnerRemoved { owner: owner("d") }).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(s.threshold(), 2);
    }

    #[test]
    fn test_submission_out_of_sequence() {
        let s = state(&["a"], 1);
        let change = StateChange::Submitted {
            action: Action::proposed(ActionId(5), ActionDescriptor::call("x"), owner("a"), Utc::now()),
        };
        assert!(matches!(
            s.check(&change),
            Err(EngineError::OutOfSequence { .. })
        ));
    }

    #[test]
    fn test_in_doubt_blocks_approvals() {
        let mut s = state(&["a", "b"], 1);
        let change = submitted(&s, "a", ActionDescriptor::call("x"));
        s.apply(change).unwrap();
        s.apply(StateChange::ExecutionStarted { id: ActionId(0) }).unwrap();

        let result = s.check(&StateChange::Approved {
            owner: owner("b"),
            id: ActionId(0),
        });
        assert!(matches!(result, Err(EngineError::InDoubt(ActionId(0)))));

        s.apply(StateChange::ExecutionRolledBack {
            id: ActionId(0),
            reason: "down".to_string(),
        })
        .unwrap();
        assert!(s.in_doubt().is_empty());
        assert!(!s.action(ActionId(0)).unwrap().is_executed());
    }

    #[test]
    fn test_confirmed_governance_applies_call() {
        let mut s = state(&["a", "b"], 2);
        let call = GovernanceCall::AddOwner { owner: owner("c") };
        let change = submitted(&s, "a", call.descriptor().unwrap());
        s.apply(change).unwrap();

        let events = s.apply(StateChange::ExecutionConfirmed { id: ActionId(0) }).unwrap();
        assert_eq!(
            events,
            vec![
                EngineEvent::OwnerAddition { owner: owner("c") },
                EngineEvent::Execution { id: ActionId(0) },
            ]
        );
        assert!(s.is_owner(&owner("c")));
        assert!(s.action(ActionId(0)).unwrap().is_executed());
    }

    #[test]
    fn test_invalid_governance_confirmation_is_atomic() {
        let mut s = state(&["a", "b"], 1);
        let call = GovernanceCall::RemoveOwner { owner: owner("zed") };
        let change = submitted(&s, "a", call.descriptor().unwrap());
        s.apply(change).unwrap();

        let result = s.apply(StateChange::ExecutionConfirmed { id: ActionId(0) });
        assert!(matches!(result, Err(EngineError::UnknownOwner(_))));
        assert!(!s.action(ActionId(0)).unwrap().is_executed());
    }

    #[test]
    fn test_stale_approval_counts_again_after_readd() {
        let mut s = state(&["a", "b", "c"], 2);
        let change = submitted(&s, "a", ActionDescriptor::call("x"));
        s.apply(change).unwrap();
        let id = ActionId(0);
        s.apply(StateChange::Approved { owner: owner("b"), id }).unwrap();
        assert_eq!(s.approval_count(id).unwrap(), 1);

        s.apply(StateChange::OwnerRemoved { owner: owner("b") }).unwrap();
        assert_eq!(s.approval_count(id).unwrap(), 0);
        assert!(s.is_approved(id, &owner("b")).unwrap());

        s.apply(StateChange::OwnerAdded { owner: owner("b") }).unwrap();
        assert_eq!(s.approval_count(id).unwrap(), 1);
    }
}
