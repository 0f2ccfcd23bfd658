//! Approval engine - serialized submit/approve/revoke/execute
//!
//! One `RwLock` guards the whole state and its journal. Mutations hold the
//! write guard from precondition check to the last journal write, dispatch
//! included, so no other mutation can interleave between the quorum check
//! and the Executed marking. Queries take the read guard and return clones.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use quorum_core::{Action, ActionDescriptor, ActionId, Owner};
use quorum_journal::{JournalError, JournalStore, StateChange};
use tokio::sync::{broadcast, RwLock};

use crate::config::{EngineConfig, GovernanceMode};
use crate::dispatch::{DispatchRequest, Dispatcher};
use crate::error::{EngineError, EngineResult};
use crate::event::EngineEvent;
use crate::governance::{GovernanceActions, GovernanceCall, GOVERNANCE_TARGET};
use crate::state::EngineState;

struct Inner {
    state: EngineState,
    journal: JournalStore,
}

impl Inner {
    /// Validate, journal, then apply. Nothing is applied if the journal
    /// write fails.
    fn commit(&mut self, change: StateChange) -> EngineResult<Vec<EngineEvent>> {
        self.state.check(&change)?;
        let record = self.journal.append(change.clone())?;
        tracing::debug!(sequence = record.sequence, change = change.kind(), "Journaled");
        self.state.apply(change)
    }

    fn ensure_owner(&self, caller: &Owner) -> EngineResult<()> {
        if !self.state.is_owner(caller) {
            tracing::warn!(caller = %caller, "Rejected call from non-owner");
            return Err(EngineError::Unauthorized(caller.clone()));
        }
        Ok(())
    }
}

/// Threshold approval engine
pub struct ApprovalEngine {
    config: EngineConfig,
    inner: RwLock<Inner>,
    dispatcher: Arc<dyn Dispatcher>,
    events: broadcast::Sender<EngineEvent>,
}

impl ApprovalEngine {
    /// Initialize a new engine in `dir` with its Genesis owners and threshold.
    ///
    /// Fails with `AlreadyInitialized` if `dir` already holds a journal.
    pub fn create(
        config: EngineConfig,
        dir: impl AsRef<Path>,
        owners: Vec<Owner>,
        threshold: usize,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> EngineResult<Self> {
        let state = EngineState::genesis(owners, threshold)?;
        let journal = JournalStore::create(dir).map_err(|e| match e {
            JournalError::AlreadyExists(_) => EngineError::AlreadyInitialized,
            other => EngineError::Journal(other),
        })?;
        Self::start(config, state, journal, dispatcher)
    }

    /// Engine whose journal lives in memory only
    pub fn in_memory(
        config: EngineConfig,
        owners: Vec<Owner>,
        threshold: usize,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> EngineResult<Self> {
        let state = EngineState::genesis(owners, threshold)?;
        Self::start(config, state, JournalStore::in_memory(), dispatcher)
    }

    /// Reopen an engine from the journal in `dir`.
    ///
    /// Replays every record, then resolves dispatches that were in flight
    /// when the previous process stopped.
    pub async fn open(
        config: EngineConfig,
        dir: impl AsRef<Path>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> EngineResult<Self> {
        let (journal, records) = JournalStore::open(dir)?;
        let state = EngineState::replay(&records)?;

        let engine = Self::assemble(config, state, journal, dispatcher);
        engine.recover().await?;

        tracing::info!(
            owners = engine.owners().await.len(),
            threshold = engine.threshold().await,
            "Engine opened"
        );
        Ok(engine)
    }

    fn start(
        config: EngineConfig,
        state: EngineState,
        mut journal: JournalStore,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> EngineResult<Self> {
        journal.append(StateChange::Genesis {
            owners: state.owners(),
            threshold: state.threshold(),
        })?;
        tracing::info!(
            owners = state.owners().len(),
            threshold = state.threshold(),
            "Engine initialized"
        );
        Ok(Self::assemble(config, state, journal, dispatcher))
    }

    fn assemble(
        config: EngineConfig,
        state: EngineState,
        journal: JournalStore,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            config,
            inner: RwLock::new(Inner { state, journal }),
            dispatcher,
            events,
        }
    }

    /// Resolve in-doubt executions left by a crash
    async fn recover(&self) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        let pending: Vec<ActionId> = inner.state.in_doubt().iter().copied().collect();

        for id in pending {
            let change = match self.dispatcher.confirm(id).await {
                Some(false) => {
                    tracing::warn!(id = %id, "In-doubt action was not dispatched, rolling back");
                    StateChange::ExecutionRolledBack {
                        id,
                        reason: "not dispatched before restart".to_string(),
                    }
                }
                outcome => {
                    tracing::warn!(
                        id = %id,
                        confirmed = outcome.is_some(),
                        "In-doubt action treated as executed"
                    );
                    StateChange::ExecutionConfirmed { id }
                }
            };
            let events = inner.commit(change)?;
            self.publish(events);
        }

        Ok(())
    }

    /// Receive every event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Governance operations (add/remove/replace owner, set threshold)
    pub fn governance(&self) -> GovernanceActions<'_> {
        GovernanceActions::new(self)
    }

    fn publish(&self, events: Vec<EngineEvent>) {
        for event in events {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }

    // === Mutations ===

    /// Record a new action in Proposed status. No quorum check here.
    pub async fn submit(&self, caller: &Owner, descriptor: ActionDescriptor) -> EngineResult<ActionId> {
        let mut inner = self.inner.write().await;
        inner.ensure_owner(caller)?;

        let id = inner.state.ledger().next_id();
        let action = Action::proposed(id, descriptor, caller.clone(), Utc::now());
        let events = inner.commit(StateChange::Submitted { action })?;

        tracing::info!(id = %id, caller = %caller, "Action submitted");
        self.publish(events);
        Ok(id)
    }

    pub async fn approve(&self, caller: &Owner, id: ActionId) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        inner.ensure_owner(caller)?;

        let events = inner.commit(StateChange::Approved {
            owner: caller.clone(),
            id,
        })?;

        tracing::info!(id = %id, owner = %caller, "Action approved");
        self.publish(events);
        Ok(())
    }

    pub async fn revoke(&self, caller: &Owner, id: ActionId) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        inner.ensure_owner(caller)?;

        let events = inner.commit(StateChange::Revoked {
            owner: caller.clone(),
            id,
        })?;

        tracing::info!(id = %id, owner = %caller, "Approval revoked");
        self.publish(events);
        Ok(())
    }

    /// Execute an action if quorum is met against the current owner set.
    ///
    /// The action is marked Executed only after dispatch succeeds. A failed
    /// dispatch leaves it Proposed with approvals intact, and the caller may
    /// retry. A timed-out dispatch is settled through `Dispatcher::confirm`:
    /// only a definite "not dispatched" rolls it back.
    pub async fn execute(&self, caller: &Owner, id: ActionId) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        inner.ensure_owner(caller)?;

        let action = inner.state.action(id)?.clone();
        if action.is_executed() {
            return Err(EngineError::ActionFinalized(id));
        }

        let approvals = inner.state.approval_count(id)?;
        let threshold = inner.state.threshold();
        if approvals < threshold {
            tracing::warn!(id = %id, approvals, threshold, "Quorum not met");
            return Err(EngineError::QuorumNotMet {
                approvals,
                threshold,
            });
        }

        if action.target == GOVERNANCE_TARGET {
            return self.execute_governance(&mut inner, id);
        }

        inner.commit(StateChange::ExecutionStarted { id })?;

        let request = DispatchRequest::from(&action);
        let outcome = match tokio::time::timeout(
            self.config.dispatch_timeout(),
            self.dispatcher.dispatch(&request),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => self.settle_timeout(id).await,
        };

        match outcome {
            Ok(()) => {
                let events = match inner.commit(StateChange::ExecutionConfirmed { id }) {
                    Ok(events) => events,
                    Err(e) => {
                        // Dispatched but not durably confirmed: still mark it
                        // executed here so it cannot go out twice
                        tracing::error!(id = %id, error = %e, "Confirmation not journaled");
                        let events = inner.state.apply(StateChange::ExecutionConfirmed { id })?;
                        self.publish(events);
                        return Err(e);
                    }
                };

                tracing::info!(
                    id = %id,
                    dispatcher = self.dispatcher.name(),
                    approvals,
                    "Action executed"
                );
                self.publish(events);
                Ok(())
            }
            Err(reason) => {
                tracing::warn!(
                    id = %id,
                    dispatcher = self.dispatcher.name(),
                    reason = %reason,
                    "Dispatch failed, rolling back"
                );
                Err(self.roll_back(&mut inner, id, reason))
            }
        }
    }

    /// A dispatch that outlived its timeout may still have taken effect.
    /// Ask the dispatcher; unless it says no, count the action as executed
    /// so it cannot go out twice.
    async fn settle_timeout(&self, id: ActionId) -> Result<(), String> {
        let reason = format!("timed out after {}ms", self.config.dispatch_timeout_ms);
        let answer = tokio::time::timeout(self.config.dispatch_timeout(), self.dispatcher.confirm(id))
            .await
            .unwrap_or(None);

        match answer {
            Some(false) => Err(reason),
            answer => {
                tracing::warn!(
                    id = %id,
                    confirmed = answer.is_some(),
                    "Dispatch timed out, treating as executed"
                );
                Ok(())
            }
        }
    }

    /// Journal a failed execution and build the caller's error.
    ///
    /// The dispatch is known not to have happened, so the action returns to
    /// Proposed in memory even when the rollback record cannot be written.
    /// On reopen the unmatched start record is settled by recovery.
    fn roll_back(&self, inner: &mut Inner, id: ActionId, reason: String) -> EngineError {
        let change = StateChange::ExecutionRolledBack {
            id,
            reason: reason.clone(),
        };

        let (events, reason) = match inner.commit(change.clone()) {
            Ok(events) => (events, reason),
            Err(e) => {
                tracing::error!(id = %id, error = %e, "Rollback not journaled");
                let events = inner.state.apply(change).unwrap_or_default();
                (events, format!("{reason}; rollback not journaled: {e}"))
            }
        };

        self.publish(events);
        EngineError::DispatchFailed { id, reason }
    }

    /// Governance actions are applied by the engine itself.
    ///
    /// A call that would break an invariant counts as a failed dispatch.
    fn execute_governance(&self, inner: &mut Inner, id: ActionId) -> EngineResult<()> {
        let change = StateChange::ExecutionConfirmed { id };
        if let Err(e) = inner.state.check(&change) {
            let reason = e.to_string();
            tracing::warn!(id = %id, reason = %reason, "Governance action rejected");
            return Err(self.roll_back(inner, id, reason));
        }

        let events = inner.commit(change)?;
        tracing::info!(id = %id, "Governance action executed");
        self.publish(events);
        Ok(())
    }

    /// Apply a governance change directly on behalf of a single owner.
    ///
    /// Refused in `GovernanceMode::Quorum`.
    pub async fn govern(&self, caller: &Owner, call: GovernanceCall) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        inner.ensure_owner(caller)?;

        if self.config.governance_mode == GovernanceMode::Quorum {
            return Err(EngineError::GovernanceRequiresQuorum);
        }

        let events = inner.commit(call.to_change())?;
        tracing::info!(caller = %caller, call = ?call, "Governance change applied");
        self.publish(events);
        Ok(())
    }

    // === Queries ===

    /// Current owner set (unordered)
    pub async fn owners(&self) -> Vec<Owner> {
        self.inner.read().await.state.owners()
    }

    pub async fn threshold(&self) -> usize {
        self.inner.read().await.state.threshold()
    }

    pub async fn action(&self, id: ActionId) -> EngineResult<Action> {
        Ok(self.inner.read().await.state.action(id)?.clone())
    }

    pub async fn actions(&self) -> Vec<Action> {
        self.inner.read().await.state.ledger().iter().cloned().collect()
    }

    pub async fn pending_actions(&self) -> Vec<Action> {
        self.inner.read().await.state.ledger().pending().cloned().collect()
    }

    /// Approvals for `id` from current owners
    pub async fn approval_count(&self, id: ActionId) -> EngineResult<usize> {
        self.inner.read().await.state.approval_count(id)
    }

    pub async fn approvers(&self, id: ActionId) -> EngineResult<Vec<Owner>> {
        self.inner.read().await.state.approvers(id)
    }

    pub async fn is_approved(&self, id: ActionId, owner: &Owner) -> EngineResult<bool> {
        self.inner.read().await.state.is_approved(id, owner)
    }

    pub async fn is_quorum_met(&self, id: ActionId) -> EngineResult<bool> {
        self.inner.read().await.state.is_quorum_met(id)
    }

    /// Snapshot of the whole state
    pub async fn snapshot(&self) -> EngineState {
        self.inner.read().await.state.clone()
    }

    /// Sequence number of the last journal record
    pub async fn journal_sequence(&self) -> u64 {
        self.inner.read().await.journal.last_sequence()
    }
}
