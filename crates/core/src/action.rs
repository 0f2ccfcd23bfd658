//! Action - a proposed privileged operation
//!
//! An action is created by submission and mutated exactly once, by the
//! transition `Proposed -> Executed`. Its target, value and payload are
//! fixed at submission time.

use crate::amount::Amount;
use crate::owner::Owner;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Sequence identifier of an action. Starts at 0, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub u64);

impl ActionId {
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ActionId)
    }
}

/// Lifecycle status of an action
///
/// There is no stored "approved" state: quorum is evaluated on demand
/// against the live owner set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    /// Awaiting quorum and execution
    Proposed,
    /// Dispatched successfully (terminal)
    Executed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Proposed => "proposed",
            ActionStatus::Executed => "executed",
        }
    }
}

/// What a caller submits: where the action goes and what it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Opaque destination understood by the dispatcher
    pub target: String,

    /// Domain-specific amount, zero when unused
    #[serde(default)]
    pub value: Amount,

    /// Opaque payload bytes (hex in JSON)
    #[serde(with = "hex", default)]
    pub payload: Vec<u8>,
}

impl ActionDescriptor {
    pub fn new(target: impl Into<String>, value: Amount, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            target: target.into(),
            value,
            payload: payload.into(),
        }
    }

    /// Descriptor with no value and no payload
    pub fn call(target: impl Into<String>) -> Self {
        Self::new(target, Amount::ZERO, Vec::new())
    }

    /// SHA-256 of the payload, hex-encoded
    pub fn payload_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.payload);
        hex::encode(hasher.finalize())
    }
}

/// A recorded action and its status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub target: String,
    pub value: Amount,
    #[serde(with = "hex")]
    pub payload: Vec<u8>,
    pub status: ActionStatus,
    pub submitted_by: Owner,
    pub submitted_at: DateTime<Utc>,
}

impl Action {
    /// Create a freshly proposed action
    pub fn proposed(
        id: ActionId,
        descriptor: ActionDescriptor,
        submitted_by: Owner,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            target: descriptor.target,
            value: descriptor.value,
            payload: descriptor.payload,
            status: ActionStatus::Proposed,
            submitted_by,
            submitted_at,
        }
    }

    pub fn is_executed(&self) -> bool {
        self.status == ActionStatus::Executed
    }

    /// The submitted descriptor, reconstructed
    pub fn descriptor(&self) -> ActionDescriptor {
        ActionDescriptor {
            target: self.target.clone(),
            value: self.value,
            payload: self.payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_strings() {
        assert_eq!(ActionStatus::Proposed.to_string(), "proposed");
        assert_eq!(ActionStatus::Executed.to_string(), "executed");
        assert_eq!("executed".parse::<ActionStatus>().unwrap(), ActionStatus::Executed);
        assert!("approved".parse::<ActionStatus>().is_err());
    }

    #[test]
    fn test_payload_serialized_as_hex() {
        let descriptor = ActionDescriptor::new(
            "treasury",
            Amount::new(dec!(10)).unwrap(),
            vec![0xde, 0xad, 0xbe, 0xef],
        );
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["payload"], "deadbeef");
        assert_eq!(json["target"], "treasury");

        let parsed: ActionDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, descriptor);
    }

    #[test]
    fn test_descriptor_defaults() {
        let parsed: ActionDescriptor = serde_json::from_str(r#"{"target":"ping"}"#).unwrap();
        assert!(parsed.value.is_zero());
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn test_payload_digest() {
        let a = ActionDescriptor::new("t", Amount::ZERO, b"payload".to_vec());
        let b = ActionDescriptor::new("other", Amount::ZERO, b"payload".to_vec());
        assert_eq!(a.payload_digest(), b.payload_digest());
        assert_eq!(a.payload_digest().len(), 64);
    }

    #[test]
    fn test_proposed_action() {
        let owner = Owner::new("alice").unwrap();
        let action = Action::proposed(ActionId(3), ActionDescriptor::call("ping"), owner, Utc::now());
        assert_eq!(action.status, ActionStatus::Proposed);
        assert!(!action.is_executed());
        assert_eq!(action.descriptor().target, "ping");
        assert_eq!(action.id.value(), 3);
    }
}
