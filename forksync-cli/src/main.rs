//! forksync: propagate merged upstream changes into a downstream fork.
//!
//! # Usage
//!
//! ```text
//! forksync run [--event <path>] [--config <path>] [--dry-run] [--json]
//! forksync preview [--event <path>] [--config <path>]
//! forksync config [--config <path>] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config::ConfigArgs, preview::PreviewArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "forksync",
    version,
    about = "Sync a downstream fork after an upstream pull request is merged",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync the fork branch for a merged pull request event.
    Run(RunArgs),

    /// Render the pull request and notification texts without contacting any service.
    Preview(PreviewArgs),

    /// Show the resolved configuration with secrets redacted.
    Config(ConfigArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Preview(args) => args.run(),
        Commands::Config(args) => args.run(),
    }
}

/// Logs go to stderr; stdout carries reports and `--json` output.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
