//! Quorum CLI - Main entry point

use clap::{Parser, Subcommand};
use quorum_cli::{commands, AppContext};
use quorum_core::{ActionId, Amount, Owner};
use quorum_engine::GovernanceCall;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "quorum")]
#[command(about = "Quorum - threshold approval engine", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, env = "QUORUM_DATA", default_value = "./data")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the journal with the Genesis owner set
    Init {
        /// Initial owner (repeat for each owner)
        #[arg(long = "owner", required = true)]
        owners: Vec<Owner>,
        /// Approvals required to execute
        #[arg(long)]
        threshold: usize,
    },

    /// Submit a new action
    Submit {
        /// Calling owner
        #[arg(long = "as")]
        caller: Owner,
        /// Opaque target the dispatcher understands
        target: String,
        /// Non-negative value carried by the action
        #[arg(long, default_value = "0")]
        value: Amount,
        /// Hex-encoded payload
        #[arg(long)]
        payload: Option<String>,
    },

    /// Approve an action
    Approve {
        #[arg(long = "as")]
        caller: Owner,
        id: ActionId,
    },

    /// Withdraw an earlier approval
    Revoke {
        #[arg(long = "as")]
        caller: Owner,
        id: ActionId,
    },

    /// Execute an action that has reached quorum
    Execute {
        #[arg(long = "as")]
        caller: Owner,
        id: ActionId,
    },

    /// Add an owner directly
    AddOwner {
        #[arg(long = "as")]
        caller: Owner,
        owner: Owner,
    },

    /// Remove an owner directly
    RemoveOwner {
        #[arg(long = "as")]
        caller: Owner,
        owner: Owner,
    },

    /// Replace an owner in place
    ReplaceOwner {
        #[arg(long = "as")]
        caller: Owner,
        old: Owner,
        new: Owner,
    },

    /// Change the approval threshold directly
    SetThreshold {
        #[arg(long = "as")]
        caller: Owner,
        threshold: usize,
    },

    /// Submit a governance change that must reach quorum
    ProposeGovernance {
        #[arg(long = "as")]
        caller: Owner,
        #[command(subcommand)]
        change: GovernanceChange,
    },

    /// Show the owner set and threshold
    Owners,

    /// Show one action with its approvals
    Show { id: ActionId },

    /// List actions
    List {
        /// Only actions not yet executed
        #[arg(long)]
        pending: bool,
    },

    /// Audit the journal (verify hash chain)
    Audit,
}

#[derive(Subcommand)]
enum GovernanceChange {
    AddOwner { owner: Owner },
    RemoveOwner { owner: Owner },
    ReplaceOwner { old: Owner, new: Owner },
    SetThreshold { threshold: usize },
}

impl From<GovernanceChange> for GovernanceCall {
    fn from(change: GovernanceChange) -> Self {
        match change {
            GovernanceChange::AddOwner { owner } => GovernanceCall::AddOwner { owner },
            GovernanceChange::RemoveOwner { owner } => GovernanceCall::RemoveOwner { owner },
            GovernanceChange::ReplaceOwner { old, new } => GovernanceCall::ReplaceOwner { old, new },
            GovernanceChange::SetThreshold { threshold } => {
                GovernanceCall::SetThreshold { threshold }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Commands that do not need a replayed engine
    match &cli.command {
        Commands::Init { owners, threshold } => {
            return commands::init(&cli.data, owners.clone(), *threshold).await;
        }
        Commands::Audit => {
            commands::audit(&cli.data)?;
            return Ok(());
        }
        _ => {}
    }

    let ctx = AppContext::open(&cli.data).await?;

    match cli.command {
        Commands::Submit {
            caller,
            target,
            value,
            payload,
        } => {
            commands::submit(&ctx, &caller, &target, value, payload.as_deref()).await?;
        }

        Commands::Approve { caller, id } => commands::approve(&ctx, &caller, id).await?,
        Commands::Revoke { caller, id } => commands::revoke(&ctx, &caller, id).await?,
        Commands::Execute { caller, id } => commands::execute(&ctx, &caller, id).await?,

        Commands::AddOwner { caller, owner } => {
            commands::govern(&ctx, &caller, GovernanceCall::AddOwner { owner }).await?;
        }
        Commands::RemoveOwner { caller, owner } => {
            commands::govern(&ctx, &caller, GovernanceCall::RemoveOwner { owner }).await?;
        }
        Commands::ReplaceOwner { caller, old, new } => {
            commands::govern(&ctx, &caller, GovernanceCall::ReplaceOwner { old, new }).await?;
        }
        Commands::SetThreshold { caller, threshold } => {
            commands::govern(&ctx, &caller, GovernanceCall::SetThreshold { threshold }).await?;
        }
        Commands::ProposeGovernance { caller, change } => {
            commands::propose_governance(&ctx, &caller, change.into()).await?;
        }

        Commands::Owners => commands::owners(&ctx).await?,
        Commands::Show { id } => commands::show(&ctx, id).await?,
        Commands::List { pending } => {
            commands::list(&ctx, pending).await?;
        }

        Commands::Init { .. } | Commands::Audit => unreachable!("handled above"),
    }

    Ok(())
}
