pub mod config;
pub mod preview;
pub mod run;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use forksync_core::{SyncConfig, TriggerEvent};

/// Where the configuration and event come from. Shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// YAML configuration file; environment variables override its values.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl SourceArgs {
    pub fn load_config(&self) -> Result<SyncConfig> {
        let env: HashMap<String, String> = std::env::vars().collect();
        SyncConfig::load(self.config.as_deref(), &env).context("failed to load configuration")
    }
}

/// Load the event payload from `--event`, falling back to `GITHUB_EVENT_PATH`.
pub fn load_event(explicit: Option<&PathBuf>, config: &SyncConfig) -> Result<TriggerEvent> {
    let path = explicit
        .or(config.event_path.as_ref())
        .context("no event payload: pass --event or set GITHUB_EVENT_PATH")?;
    TriggerEvent::load_at(path)
        .with_context(|| format!("failed to read event payload from {}", path.display()))
}
