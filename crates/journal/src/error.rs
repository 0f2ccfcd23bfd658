//! Journal errors

use crate::hash::ChainError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Journal integrity error: {0}")]
    Chain(#[from] ChainError),

    #[error("Journal already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Journal is locked by another process: {}", .0.display())]
    Locked(PathBuf),

    #[error("Invalid journal line {line}: {reason}")]
    InvalidLine { line: usize, reason: String },
}
