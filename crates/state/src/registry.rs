//! Owner registry - the current owner set
//!
//! Removal swaps the removed owner with the last one, so member order is
//! only insertion order until the first removal. Callers must treat
//! `members()` as a set.

use crate::error::StateError;
use quorum_core::Owner;

/// Maximum number of owners
pub const MAX_OWNERS: usize = 10;

/// Current owner set. Invariant: `1 <= count <= MAX_OWNERS`, no duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRegistry {
    owners: Vec<Owner>,
}

impl OwnerRegistry {
    /// Build a registry from an initial owner set
    pub fn new(owners: impl IntoIterator<Item = Owner>) -> Result<Self, StateError> {
        let mut registry = Self { owners: Vec::new() };
        for owner in owners {
            registry.add(owner)?;
        }
        if registry.owners.is_empty() {
            return Err(StateError::EmptyOwnerSet);
        }
        Ok(registry)
    }

    pub fn contains(&self, owner: &Owner) -> bool {
        self.owners.contains(owner)
    }

    /// Snapshot of the current members
    pub fn members(&self) -> Vec<Owner> {
        self.owners.clone()
    }

    pub fn as_slice(&self) -> &[Owner] {
        &self.owners
    }

    pub fn count(&self) -> usize {
        self.owners.len()
    }

    pub fn check_add(&self, owner: &Owner) -> Result<(), StateError> {
        if self.contains(owner) {
            return Err(StateError::DuplicateOwner(owner.clone()));
        }
        if self.owners.len() >= MAX_OWNERS {
            return Err(StateError::CapacityExceeded { max: MAX_OWNERS });
        }
        Ok(())
    }

    pub fn add(&mut self, owner: Owner) -> Result<(), StateError> {
        self.check_add(&owner)?;
        self.owners.push(owner);
        Ok(())
    }

    pub fn check_remove(&self, owner: &Owner) -> Result<usize, StateError> {
        let index = self
            .position(owner)
            .ok_or_else(|| StateError::UnknownOwner(owner.clone()))?;
        if self.owners.len() == 1 {
            return Err(StateError::LastOwner(owner.clone()));
        }
        Ok(index)
    }

    /// Remove an owner, returning the new owner count
    pub fn remove(&mut self, owner: &Owner) -> Result<usize, StateError> {
        let index = self.check_remove(owner)?;
        self.owners.swap_remove(index);
        Ok(self.owners.len())
    }

    pub fn check_replace(&self, old: &Owner, new: &Owner) -> Result<usize, StateError> {
        let index = self
            .position(old)
            .ok_or_else(|| StateError::UnknownOwner(old.clone()))?;
        if self.contains(new) {
            return Err(StateError::DuplicateOwner(new.clone()));
        }
        Ok(index)
    }

    /// Swap `old` for `new` in place; the count never changes.
    pub fn replace(&mut self, old: &Owner, new: Owner) -> Result<(), StateError> {
        let index = self.check_replace(old, &new)?;
        self.owners[index] = new;
        Ok(())
    }

    fn position(&self, owner: &Owner) -> Option<usize> {
        self.owners.iter().position(|o| o == owner)
    }
}
