//! Dispatch collaborator - performs an executed action's external effect
//!
//! The engine calls `dispatch` while holding its write lock, wrapped in the
//! configured timeout. `Err` rolls the execution back. A timeout is settled
//! by asking `confirm`, because the effect may already have happened.
//!
//! `confirm` is the recovery half of a fire-and-confirm contract: after a
//! crash between "execution started" and its outcome, the engine asks the
//! dispatcher whether the action went out. `None` means unknown, and the
//! engine then assumes it did, so an action is never dispatched twice.

use async_trait::async_trait;
use quorum_core::{Action, ActionId, Amount};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// File name of the outbox inside a data directory
pub const OUTBOX_FILE: &str = "outbox.jsonl";

/// What the dispatcher receives for an executed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub id: ActionId,
    pub target: String,
    pub value: Amount,
    #[serde(with = "hex")]
    pub payload: Vec<u8>,
}

impl From<&Action> for DispatchRequest {
    fn from(action: &Action) -> Self {
        Self {
            id: action.id,
            target: action.target.clone(),
            value: action.value,
            payload: action.payload.clone(),
        }
    }
}

/// Errors reported by a dispatcher
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Target rejected the action: {0}")]
    Rejected(String),

    #[error("Target unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Dispatcher name for logging
    fn name(&self) -> &str;

    /// Perform the action's effect. Must not return `Ok` unless it happened.
    async fn dispatch(&self, request: &DispatchRequest) -> Result<(), DispatchError>;

    /// Whether `id` was dispatched: `Some(true)`, `Some(false)`, or `None`
    /// when the dispatcher cannot tell.
    async fn confirm(&self, _id: ActionId) -> Option<bool> {
        None
    }
}

/// Dispatcher that accepts everything and does nothing
pub struct NoOpDispatcher;

#[async_trait]
impl Dispatcher for NoOpDispatcher {
    fn name(&self) -> &str {
        "NoOp"
    }

    async fn dispatch(&self, _request: &DispatchRequest) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// In-memory dispatcher that records successful calls.
///
/// Can be told to fail the next N calls, or to stall each call before or
/// after its effect, which makes rollback and timeout paths easy to drive.
#[derive(Default)]
pub struct RecordingDispatcher {
    calls: Mutex<Vec<DispatchRequest>>,
    failures_remaining: AtomicUsize,
    delay: Option<Duration>,
    ack_delay: Option<Duration>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every dispatch, before recording it
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep this long after recording, before returning
    pub fn with_ack_delay(mut self, delay: Duration) -> Self {
        self.ack_delay = Some(delay);
        self
    }

    /// Fail the next `n` dispatch calls
    pub fn fail_next(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Successful calls, in order
    pub fn calls(&self) -> Vec<DispatchRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    pub fn dispatched(&self, id: ActionId) -> usize {
        self.calls().iter().filter(|r| r.id == id).count()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    fn name(&self) -> &str {
        "Recording"
    }

    async fn dispatch(&self, request: &DispatchRequest) -> Result<(), DispatchError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DispatchError::Unavailable(format!(
                "scripted failure for action {}",
                request.id
            )));
        }

        self.calls
            .lock()
            .map_err(|_| DispatchError::Unavailable("recorder poisoned".to_string()))?
            .push(request.clone());

        if let Some(delay) = self.ack_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn confirm(&self, id: ActionId) -> Option<bool> {
        Some(self.dispatched(id) > 0)
    }
}

/// Dispatcher that appends each request as a JSON line to an outbox file.
///
/// A downstream relay drains the outbox. Because the outbox itself is the
/// record of what went out, `confirm` can answer definitively.
pub struct OutboxDispatcher {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl OutboxDispatcher {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Outbox at `<dir>/outbox.jsonl`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(OUTBOX_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every request in the outbox
    pub async fn read_all(&self) -> Result<Vec<DispatchRequest>, DispatchError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(DispatchError::from))
            .collect()
    }
}

#[async_trait]
impl Dispatcher for OutboxDispatcher {
    fn name(&self) -> &str {
        "Outbox"
    }

    async fn dispatch(&self, request: &DispatchRequest) -> Result<(), DispatchError> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_string(request)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.sync_data().await?;
        Ok(())
    }

    async fn confirm(&self, id: ActionId) -> Option<bool> {
        match self.read_all().await {
            Ok(requests) => Some(requests.iter().any(|r| r.id == id)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Outbox unreadable");
                None
            }
        }
    }
}
