//! Application context - wires config, journal and dispatcher together

use anyhow::Context;
use quorum_core::Owner;
use quorum_engine::{ApprovalEngine, EngineConfig, EngineError, OutboxDispatcher};
use quorum_journal::JournalError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Engine config file inside the data directory
pub const CONFIG_FILE: &str = "config.json";

/// Application context - one engine bound to a data directory
pub struct AppContext {
    pub engine: ApprovalEngine,
    data_path: PathBuf,
}

impl AppContext {
    /// Open an initialized data directory, replaying its journal
    pub async fn open(data_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let data_path = data_path.as_ref().to_path_buf();
        let config = load_config(&data_path)?;
        let dispatcher = Arc::new(OutboxDispatcher::in_dir(&data_path));

        let engine = match ApprovalEngine::open(config, &data_path, dispatcher).await {
            Ok(engine) => engine,
            Err(EngineError::NotInitialized) => anyhow::bail!(
                "No journal in {}; run `quorum init` first",
                data_path.display()
            ),
            Err(EngineError::Journal(JournalError::Locked(_))) => anyhow::bail!(
                "{} is in use by another quorum process",
                data_path.display()
            ),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { engine, data_path })
    }

    /// Initialize a fresh data directory with its Genesis owners and threshold
    pub fn init(
        data_path: impl AsRef<Path>,
        owners: Vec<Owner>,
        threshold: usize,
    ) -> anyhow::Result<Self> {
        let data_path = data_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_path)
            .with_context(|| format!("Cannot create {}", data_path.display()))?;

        let config = load_config(&data_path)?;
        let dispatcher = Arc::new(OutboxDispatcher::in_dir(&data_path));
        let engine = ApprovalEngine::create(config, &data_path, owners, threshold, dispatcher)?;

        Ok(Self { engine, data_path })
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }
}

/// `<data>/config.json` if present, defaults otherwise
fn load_config(data_path: &Path) -> anyhow::Result<EngineConfig> {
    let path = data_path.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(EngineConfig::default());
    }

    let config = EngineConfig::from_file(&path)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Loaded engine config");
    Ok(config)
}
