//! Quorum Journal - hash-chained JSONL write-ahead log
//!
//! Every state change is appended here before it is applied in memory.
//! The journal is the Source of Truth: engine state is rebuilt by replaying
//! it from the Genesis record.

pub mod error;
pub mod hash;
pub mod reader;
pub mod record;
pub mod store;

pub use error::JournalError;
pub use hash::{calculate_record_hash, verify_chain, ChainError, GENESIS_HASH};
pub use reader::{JournalReader, JournalScan};
pub use record::{JournalRecord, StateChange};
pub use store::{JournalStore, JOURNAL_FILE, LOCK_FILE};
