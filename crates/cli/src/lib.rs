//! Quorum CLI - command orchestration over the approval engine
//!
//! This crate provides the `quorum` binary and the commands it runs.

pub mod commands;
pub mod context;

pub use context::AppContext;
