//! Integration tests for the Quorum CLI
//!
//! These drive the commands against a real data directory: journal,
//! outbox and config file included.

use quorum_cli::{commands, context::CONFIG_FILE, AppContext};
use quorum_core::{Amount, Owner};
use quorum_engine::{EngineError, GovernanceCall, OUTBOX_FILE};
use quorum_journal::JournalError;
use tempfile::TempDir;

fn owner(id: &str) -> Owner {
    Owner::new(id).unwrap()
}

async fn initialized(dir: &TempDir) -> AppContext {
    commands::init(dir.path(), vec![owner("alice"), owner("bob"), owner("carol")], 2)
        .await
        .unwrap();
    AppContext::open(dir.path()).await.unwrap()
}

/// Test: init → submit → approve ×2 → execute → outbox + audit
#[tokio::test]
async fn test_full_workflow() {
    let dir = TempDir::new().unwrap();
    let ctx = initialized(&dir).await;

    let id = commands::submit(
        &ctx,
        &owner("alice"),
        "payments",
        "250.5".parse::<Amount>().unwrap(),
        Some("0xdeadbeef"),
    )
    .await
    .unwrap();

    commands::approve(&ctx, &owner("alice"), id).await.unwrap();
    assert!(commands::execute(&ctx, &owner("bob"), id).await.is_err());

    commands::approve(&ctx, &owner("bob"), id).await.unwrap();
    commands::execute(&ctx, &owner("carol"), id).await.unwrap();

    let outbox = std::fs::read_to_string(dir.path().join(OUTBOX_FILE)).unwrap();
    assert_eq!(outbox.lines().count(), 1);
    assert!(outbox.contains("deadbeef"));
    assert!(outbox.contains("payments"));

    // genesis, submit, 2 approvals, started, confirmed
    assert_eq!(commands::audit(dir.path()).unwrap(), 6);
    assert!(commands::list(&ctx, true).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let ctx = initialized(&dir).await;
        let id = commands::submit(&ctx, &owner("bob"), "ops", Amount::ZERO, None)
            .await
            .unwrap();
        commands::approve(&ctx, &owner("carol"), id).await.unwrap();
        commands::govern(&ctx, &owner("alice"), GovernanceCall::SetThreshold { threshold: 1 })
            .await
            .unwrap();
    }

    let ctx = AppContext::open(dir.path()).await.unwrap();
    assert_eq!(ctx.engine.threshold().await, 1);

    let pending = commands::list(&ctx, true).await.unwrap();
    assert_eq!(pending.len(), 1);

    commands::execute(&ctx, &owner("alice"), pending[0].id).await.unwrap();
    assert!(commands::list(&ctx, true).await.unwrap().is_empty());
    assert_eq!(commands::list(&ctx, false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_init_twice_and_open_uninitialized() {
    let dir = TempDir::new().unwrap();
    let ctx = initialized(&dir).await;

    // a live context holds the directory
    let err = commands::init(dir.path(), vec![owner("mallory")], 1).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::Journal(JournalError::Locked(_)))
    ));
    let err = AppContext::open(dir.path()).await.err().unwrap();
    assert!(err.to_string().contains("in use"));
    drop(ctx);

    let again = commands::init(dir.path(), vec![owner("mallory")], 1).await;
    let err = again.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::AlreadyInitialized)
    ));

    let empty = TempDir::new().unwrap();
    assert!(AppContext::open(empty.path()).await.is_err());
    assert!(commands::audit(empty.path()).is_err());
}

#[tokio::test]
async fn test_bad_payload_rejected() {
    let dir = TempDir::new().unwrap();
    let ctx = initialized(&dir).await;

    let result = commands::submit(&ctx, &owner("alice"), "x", Amount::ZERO, Some("zz")).await;
    assert!(result.is_err());
    assert!(ctx.engine.actions().await.is_empty());
}

#[tokio::test]
async fn test_config_file_selects_quorum_governance() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        r#"{ "governance_mode": "quorum" }"#,
    )
    .unwrap();
    let ctx = initialized(&dir).await;

    let direct = commands::govern(
        &ctx,
        &owner("alice"),
        GovernanceCall::AddOwner { owner: owner("dave") },
    )
    .await;
    assert!(direct.is_err());

    let id = commands::propose_governance(
        &ctx,
        &owner("alice"),
        GovernanceCall::AddOwner { owner: owner("dave") },
    )
    .await
    .unwrap();
    commands::approve(&ctx, &owner("alice"), id).await.unwrap();
    commands::approve(&ctx, &owner("bob"), id).await.unwrap();
    commands::execute(&ctx, &owner("carol"), id).await.unwrap();

    assert!(ctx.engine.owners().await.contains(&owner("dave")));
    // governance actions never reach the outbox
    assert!(!dir.path().join(OUTBOX_FILE).exists());
}

#[tokio::test]
async fn test_tampered_journal_fails_audit() {
    let dir = TempDir::new().unwrap();
    {
        let ctx = initialized(&dir).await;
        commands::submit(&ctx, &owner("alice"), "ops", Amount::ZERO, None)
            .await
            .unwrap();
    }

    let ctx_path = dir.path().join(quorum_journal::JOURNAL_FILE);
    let content = std::fs::read_to_string(&ctx_path).unwrap();
    std::fs::write(&ctx_path, content.replace("\"ops\"", "\"evil\"")).unwrap();

    assert!(commands::audit(dir.path()).is_err());
    assert!(AppContext::open(dir.path()).await.is_err());
}
