//! Quorum State - the four state components behind the approval engine
//!
//! - `OwnerRegistry`: current owners, bounded to 1..=10, no duplicates
//! - `ThresholdPolicy`: quorum size, always within 1..=owner count
//! - `ActionLedger`: append-only store of proposed actions
//! - `ApprovalMatrix`: per (action, owner) approval bits
//!
//! Every mutation has a matching `check_*` that validates without touching
//! state, so a caller can validate, persist, then apply.

pub mod error;
pub mod ledger;
pub mod matrix;
pub mod registry;
pub mod threshold;

pub use error::StateError;
pub use ledger::ActionLedger;
pub use matrix::ApprovalMatrix;
pub use registry::{OwnerRegistry, MAX_OWNERS};
pub use threshold::ThresholdPolicy;
