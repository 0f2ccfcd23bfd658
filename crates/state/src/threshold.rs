//! Threshold policy - the quorum size

use crate::error::StateError;

/// Quorum size. Invariant: `1 <= threshold <= owner count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdPolicy {
    threshold: usize,
}

impl ThresholdPolicy {
    pub fn new(threshold: usize, owner_count: usize) -> Result<Self, StateError> {
        Self::check(threshold, owner_count)?;
        Ok(Self { threshold })
    }

    pub fn check(value: usize, owner_count: usize) -> Result<(), StateError> {
        if value == 0 || value > owner_count {
            return Err(StateError::InvalidThreshold {
                value,
                owners: owner_count,
            });
        }
        Ok(())
    }

    pub fn set(&mut self, value: usize, owner_count: usize) -> Result<(), StateError> {
        Self::check(value, owner_count)?;
        self.threshold = value;
        Ok(())
    }

    pub fn get(&self) -> usize {
        self.threshold
    }

    /// Lower the threshold to `max` if it exceeds it.
    ///
    /// Returns the new threshold when it changed. Called after every owner
    /// removal so the quorum stays reachable.
    pub fn clamp_to(&mut self, max: usize) -> Option<usize> {
        if self.threshold > max {
            self.threshold = max;
            Some(max)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(ThresholdPolicy::new(1, 1).is_ok());
        assert!(ThresholdPolicy::new(3, 3).is_ok());
        assert_eq!(
            ThresholdPolicy::new(0, 3),
            Err(StateError::InvalidThreshold { value: 0, owners: 3 })
        );
        assert_eq!(
            ThresholdPolicy::new(4, 3),
            Err(StateError::InvalidThreshold { value: 4, owners: 3 })
        );
    }

    #[test]
    fn test_set_rejected_leaves_value() {
        let mut policy = ThresholdPolicy::new(2, 3).unwrap();
        assert!(policy.set(5, 3).is_err());
        assert_eq!(policy.get(), 2);
        policy.set(3, 3).unwrap();
        assert_eq!(policy.get(), 3);
    }

    #[test]
    fn test_clamp() {
        let mut policy = ThresholdPolicy::new(3, 3).unwrap();
        assert_eq!(policy.clamp_to(3), None);
        assert_eq!(policy.clamp_to(2), Some(2));
        assert_eq!(policy.get(), 2);
        assert_eq!(policy.clamp_to(5), None);
        assert_eq!(policy.get(), 2);
    }
}
