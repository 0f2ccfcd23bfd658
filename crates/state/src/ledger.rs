//! Action ledger - append-only store of proposed actions
//!
//! Ids are dense: the action with id `n` lives at index `n`.

use crate::error::StateError;
use chrono::{DateTime, Utc};
use quorum_core::{Action, ActionDescriptor, ActionId, ActionStatus, Owner};

#[derive(Debug, Clone, Default)]
pub struct ActionLedger {
    actions: Vec<Action>,
}

impl ActionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next proposal will receive
    pub fn next_id(&self) -> ActionId {
        ActionId(self.actions.len() as u64)
    }

    /// Record a new action in `Proposed` status and return its id.
    ///
    /// No access control here: the engine gates callers before proposing.
    pub fn propose(
        &mut self,
        descriptor: ActionDescriptor,
        submitted_by: Owner,
        submitted_at: DateTime<Utc>,
    ) -> ActionId {
        let id = self.next_id();
        self.actions
            .push(Action::proposed(id, descriptor, submitted_by, submitted_at));
        id
    }

    pub fn get(&self, id: ActionId) -> Result<&Action, StateError> {
        usize::try_from(id.value())
            .ok()
            .and_then(|index| self.actions.get(index))
            .ok_or(StateError::UnknownAction(id))
    }

    pub fn check_mark_executed(&self, id: ActionId) -> Result<(), StateError> {
        if self.get(id)?.is_executed() {
            return Err(StateError::AlreadyExecuted(id));
        }
        Ok(())
    }

    /// Transition `Proposed -> Executed`. Rejects a second call.
    pub fn mark_executed(&mut self, id: ActionId) -> Result<(), StateError> {
        self.check_mark_executed(id)?;
        // check above guarantees the index exists
        if let Some(action) = self.actions.get_mut(id.value() as usize) {
            action.status = ActionStatus::Executed;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    /// Actions still awaiting execution
    pub fn pending(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| !a.is_executed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Owner {
        Owner::new("alice").unwrap()
    }

    #[test]
    fn test_ids_start_at_zero_and_increase() {
        let mut ledger = ActionLedger::new();
        assert_eq!(ledger.next_id(), ActionId(0));

        let a = ledger.propose(ActionDescriptor::call("a"), alice(), Utc::now());
        let b = ledger.propose(ActionDescriptor::call("b"), alice(), Utc::now());
        assert_eq!(a, ActionId(0));
        assert_eq!(b, ActionId(1));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get(b).unwrap().target, "b");
    }

    #[test]
    fn test_get_unknown() {
        let ledger = ActionLedger::new();
        assert_eq!(
            ledger.get(ActionId(0)).unwrap_err(),
            StateError::UnknownAction(ActionId(0))
        );
        assert!(ledger.get(ActionId(u64::MAX)).is_err());
    }

    #[test]
    fn test_mark_executed_once() {
        let mut ledger = ActionLedger::new();
        let id = ledger.propose(ActionDescriptor::call("x"), alice(), Utc::now());

        ledger.mark_executed(id).unwrap();
        assert!(ledger.get(id).unwrap().is_executed());
        assert_eq!(ledger.mark_executed(id), Err(StateError::AlreadyExecuted(id)));
        assert_eq!(
            ledger.mark_executed(ActionId(9)),
            Err(StateError::UnknownAction(ActionId(9)))
        );
    }

    #[test]
    fn test_pending_filters_executed() {
        let mut ledger = ActionLedger::new();
        let first = ledger.propose(ActionDescriptor::call("x"), alice(), Utc::now());
        ledger.propose(ActionDescriptor::call("y"), alice(), Utc::now());
        ledger.mark_executed(first).unwrap();

        let pending: Vec<_> = ledger.pending().map(|a| a.id).collect();
        assert_eq!(pending, vec![ActionId(1)]);
    }
}
