//! Owner - Opaque principal identifier
//!
//! Owners are compared by their normalized form: surrounding whitespace is
//! stripped and letters are upper-cased, so `alice` and ` ALICE ` are the
//! same principal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from owner identifier construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OwnerError {
    #[error("Owner identifier is the null sentinel: {0:?}")]
    Null(String),
}

/// A principal allowed to submit, approve, revoke and execute actions.
///
/// The null sentinel (empty, or only zero digits with an optional `0x`
/// prefix) is never a valid owner.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Owner(String);

impl Owner {
    /// Create an owner from a raw identifier.
    pub fn new(id: impl AsRef<str>) -> Result<Self, OwnerError> {
        let raw = id.as_ref();
        if Self::is_null(raw) {
            return Err(OwnerError::Null(raw.to_string()));
        }
        Ok(Self(raw.trim().to_uppercase()))
    }

    /// Whether a raw identifier is the null sentinel.
    pub fn is_null(raw: &str) -> bool {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        digits.is_empty() || digits.chars().all(|c| c == '0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Owner {
    type Err = OwnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Owner {
    type Error = OwnerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Owner> for String {
    fn from(owner: Owner) -> Self {
        owner.0
    }
}
