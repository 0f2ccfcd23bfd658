//! Quorum Engine - threshold approval state machine
//!
//! A bounded group of owners jointly controls execution of arbitrary
//! actions. An action runs at most once, and only when enough *current*
//! owners have approved it at the moment of execution:
//!
//! ```text
//! submit ──► Proposed ──approve/revoke──► Proposed
//!                │
//!                ▼ execute (quorum evaluated against live owners)
//!        ┌──────────────────┐
//!        │ journal: started │
//!        └────────┬─────────┘
//!                 ▼
//!        ┌──────────────────┐   failure / not sent  ┌─────────────────────┐
//!        │ dispatch         │──────────────────────►│ journal: rolled back│──► Proposed
//!        └────────┬─────────┘                       └─────────────────────┘
//!                 │ success
//!                 ▼
//!        ┌──────────────────┐
//!        │ journal: confirm │──► Executed
//!        └──────────────────┘
//! ```
//!
//! A dispatch that times out is settled with `Dispatcher::confirm`; only a
//! definite "not sent" takes the rollback path.
//!
//! All mutations are serialized behind a single write lock; queries are
//! served from snapshots under the read lock.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod governance;
pub mod state;

pub use config::{EngineConfig, GovernanceMode};
pub use dispatch::{
    DispatchError, DispatchRequest, Dispatcher, NoOpDispatcher, OutboxDispatcher,
    RecordingDispatcher, OUTBOX_FILE,
};
pub use engine::ApprovalEngine;
pub use error::{EngineError, EngineResult};
pub use event::EngineEvent;
pub use governance::{GovernanceActions, GovernanceCall, GOVERNANCE_TARGET};
pub use state::EngineState;
