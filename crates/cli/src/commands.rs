//! CLI commands

use anyhow::Context;
use quorum_core::{Action, ActionDescriptor, ActionId, Amount, Owner};
use quorum_engine::GovernanceCall;
use quorum_journal::{verify_chain, JournalReader, JOURNAL_FILE};
use serde_json::json;
use std::path::Path;

use crate::context::AppContext;

/// Initialize a data directory with its Genesis owner set
pub async fn init(data_path: &Path, owners: Vec<Owner>, threshold: usize) -> anyhow::Result<()> {
    let ctx = AppContext::init(data_path, owners, threshold)?;

    println!(
        "✅ Initialized {} with {} owners, threshold {}",
        ctx.data_path().display(),
        ctx.engine.owners().await.len(),
        ctx.engine.threshold().await
    );
    Ok(())
}

/// Submit a new action; returns its id
pub async fn submit(
    ctx: &AppContext,
    caller: &Owner,
    target: &str,
    value: Amount,
    payload_hex: Option<&str>,
) -> anyhow::Result<ActionId> {
    let payload = match payload_hex {
        Some(raw) => {
            let raw = raw.strip_prefix("0x").unwrap_or(raw);
            hex::decode(raw).context("Payload must be hex")?
        }
        None => Vec::new(),
    };

    let id = ctx
        .engine
        .submit(caller, ActionDescriptor::new(target, value, payload))
        .await?;

    println!("✅ Submitted action {} -> {} (value {})", id, target, value);
    Ok(id)
}

pub async fn approve(ctx: &AppContext, caller: &Owner, id: ActionId) -> anyhow::Result<()> {
    ctx.engine.approve(caller, id).await?;
    print_progress(ctx, "Approved", caller, id).await
}

pub async fn revoke(ctx: &AppContext, caller: &Owner, id: ActionId) -> anyhow::Result<()> {
    ctx.engine.revoke(caller, id).await?;
    print_progress(ctx, "Revoked", caller, id).await
}

async fn print_progress(
    ctx: &AppContext,
    verb: &str,
    caller: &Owner,
    id: ActionId,
) -> anyhow::Result<()> {
    let approvals = ctx.engine.approval_count(id).await?;
    let threshold = ctx.engine.threshold().await;
    println!(
        "✅ {} action {} as {} ({}/{} approvals)",
        verb, id, caller, approvals, threshold
    );
    Ok(())
}

/// Execute an action that has reached quorum
pub async fn execute(ctx: &AppContext, caller: &Owner, id: ActionId) -> anyhow::Result<()> {
    ctx.engine.execute(caller, id).await?;
    println!("✅ Executed action {}", id);
    Ok(())
}

/// Apply a governance change directly
pub async fn govern(ctx: &AppContext, caller: &Owner, call: GovernanceCall) -> anyhow::Result<()> {
    let summary = describe(&call);
    ctx.engine.govern(caller, call).await?;

    println!(
        "✅ {} ({} owners, threshold {})",
        summary,
        ctx.engine.owners().await.len(),
        ctx.engine.threshold().await
    );
    Ok(())
}

/// Submit a governance change as an action that must reach quorum
pub async fn propose_governance(
    ctx: &AppContext,
    caller: &Owner,
    call: GovernanceCall,
) -> anyhow::Result<ActionId> {
    let summary = describe(&call);
    let id = ctx.engine.governance().propose(caller, call).await?;
    println!("✅ Proposed governance action {}: {}", id, summary);
    Ok(id)
}

fn describe(call: &GovernanceCall) -> String {
    match call {
        GovernanceCall::AddOwner { owner } => format!("Added owner {}", owner),
        GovernanceCall::RemoveOwner { owner } => format!("Removed owner {}", owner),
        GovernanceCall::ReplaceOwner { old, new } => format!("Replaced owner {} with {}", old, new),
        GovernanceCall::SetThreshold { threshold } => format!("Set threshold to {}", threshold),
    }
}

/// Print the current owner set and threshold
pub async fn owners(ctx: &AppContext) -> anyhow::Result<()> {
    let owners = ctx.engine.owners().await;
    let threshold = ctx.engine.threshold().await;

    println!("👥 Owners ({}), threshold {}:", owners.len(), threshold);
    for owner in owners {
        println!("   {}", owner);
    }
    Ok(())
}

/// Print one action with its approvals as JSON
pub async fn show(ctx: &AppContext, id: ActionId) -> anyhow::Result<()> {
    let action = ctx.engine.action(id).await?;
    let approvers = ctx.engine.approvers(id).await?;
    let threshold = ctx.engine.threshold().await;

    let view = json!({
        "action": action,
        "approvers": approvers,
        "approvals": approvers.len(),
        "threshold": threshold,
        "payload_sha256": action.descriptor().payload_digest(),
    });
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

/// List actions, optionally only those still awaiting execution
pub async fn list(ctx: &AppContext, pending: bool) -> anyhow::Result<Vec<Action>> {
    let actions = if pending {
        ctx.engine.pending_actions().await
    } else {
        ctx.engine.actions().await
    };

    if actions.is_empty() {
        println!("No actions");
        return Ok(actions);
    }

    for action in &actions {
        let approvals = ctx.engine.approval_count(action.id).await?;
        println!(
            "{:>4}  {:<9} {:<24} value {:<10} approvals {}  by {}",
            action.id,
            action.status.as_str(),
            action.target,
            action.value,
            approvals,
            action.submitted_by
        );
    }
    Ok(actions)
}

/// Verify the journal hash chain; returns the number of records checked
pub fn audit(data_path: &Path) -> anyhow::Result<usize> {
    let reader = JournalReader::open(data_path.join(JOURNAL_FILE));
    let records = reader.read_all()?;

    if records.is_empty() {
        anyhow::bail!("No journal in {}", data_path.display());
    }

    verify_chain(&records).context("Hash chain broken")?;
    println!("✅ Hash chain verified ({} records)", records.len());
    Ok(records.len())
}
