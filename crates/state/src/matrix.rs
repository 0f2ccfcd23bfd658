//! Approval matrix - sparse (action, owner) -> approved relation
//!
//! Approvals are never cleared when an owner leaves. Counting walks the
//! live owner set handed in by the caller, so a removed owner's approval
//! stops counting without being erased, and counts again if that owner is
//! re-added.

use crate::error::StateError;
use quorum_core::{ActionId, Owner};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct ApprovalMatrix {
    approvals: HashMap<ActionId, HashSet<Owner>>,
}

impl ApprovalMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_approved(&self, id: ActionId, owner: &Owner) -> bool {
        self.approvals
            .get(&id)
            .is_some_and(|owners| owners.contains(owner))
    }

    /// Reject no-op writes: approving twice or revoking a missing approval.
    pub fn check_set_approval(
        &self,
        id: ActionId,
        owner: &Owner,
        value: bool,
    ) -> Result<(), StateError> {
        match (value, self.is_approved(id, owner)) {
            (true, true) => Err(StateError::AlreadyApproved {
                id,
                owner: owner.clone(),
            }),
            (false, false) => Err(StateError::NotApproved {
                id,
                owner: owner.clone(),
            }),
            _ => Ok(()),
        }
    }

    pub fn set_approval(&mut self, id: ActionId, owner: &Owner, value: bool) -> Result<(), StateError> {
        self.check_set_approval(id, owner, value)?;
        if value {
            self.approvals.entry(id).or_default().insert(owner.clone());
        } else if let Some(owners) = self.approvals.get_mut(&id) {
            owners.remove(owner);
            if owners.is_empty() {
                self.approvals.remove(&id);
            }
        }
        Ok(())
    }

    /// Number of `live` owners that approved `id`
    pub fn count_approvals(&self, id: ActionId, live: &[Owner]) -> usize {
        live.iter().filter(|owner| self.is_approved(id, owner)).count()
    }

    /// The `live` owners that approved `id`, in `live` order
    pub fn approvers(&self, id: ActionId, live: &[Owner]) -> Vec<Owner> {
        live.iter()
            .filter(|owner| self.is_approved(id, owner))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(id: &str) -> Owner {
        Owner::new(id).unwrap()
    }

    #[test]
    fn test_approve_twice_rejected() {
        let mut matrix = ApprovalMatrix::new();
        let id = ActionId(0);
        matrix.set_approval(id, &owner("a"), true).unwrap();

        let err = matrix.set_approval(id, &owner("a"), true).unwrap_err();
        assert_eq!(err, StateError::AlreadyApproved { id, owner: owner("a") });
        assert!(matrix.is_approved(id, &owner("a")));
    }

    #[test]
    fn test_revoke_without_approval_rejected() {
        let mut matrix = ApprovalMatrix::new();
        let id = ActionId(1);
        let err = matrix.set_approval(id, &owner("a"), false).unwrap_err();
        assert_eq!(err, StateError::NotApproved { id, owner: owner("a") });

        matrix.set_approval(id, &owner("a"), true).unwrap();
        matrix.set_approval(id, &owner("a"), false).unwrap();
        assert!(!matrix.is_approved(id, &owner("a")));
    }

    #[test]
    fn test_count_uses_live_owners_only() {
        let mut matrix = ApprovalMatrix::new();
        let id = ActionId(0);
        matrix.set_approval(id, &owner("a"), true).unwrap();
        matrix.set_approval(id, &owner("b"), true).unwrap();

        let all = [owner("a"), owner("b"), owner("c")];
        assert_eq!(matrix.count_approvals(id, &all), 2);

        // b removed from the owner set: its approval is retained but ignored
        let live = [owner("a"), owner("c")];
        assert_eq!(matrix.count_approvals(id, &live), 1);
        assert_eq!(matrix.approvers(id, &live), vec![owner("a")]);
        assert!(matrix.is_approved(id, &owner("b")));
    }

    #[test]
    fn test_approvals_are_per_action() {
        let mut matrix = ApprovalMatrix::new();
        matrix.set_approval(ActionId(0), &owner("a"), true).unwrap();
        assert!(!matrix.is_approved(ActionId(1), &owner("a")));
        assert_eq!(matrix.count_approvals(ActionId(1), &[owner("a")]), 0);
    }
}
