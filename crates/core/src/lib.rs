//! Quorum Core - Domain types
//!
//! This crate contains the fundamental types shared by every Quorum crate:
//! - `Owner`: Opaque principal identifier allowed to act on the engine
//! - `Amount`: Non-negative decimal attached to an action as its `value`
//! - `Action`: A proposed privileged operation and its lifecycle status

pub mod action;
pub mod amount;
pub mod owner;

pub use action::{Action, ActionDescriptor, ActionId, ActionStatus};
pub use amount::{Amount, AmountError};
pub use owner::{Owner, OwnerError};
