//! `forksync run`: the sync orchestrator for one merge event.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use forksync_core::SyncOutcome;
use forksync_sync::{pipeline, RunReport, SkipReason};

use super::{load_event, SourceArgs};

/// Arguments for `forksync run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Pull request event payload (defaults to `GITHUB_EVENT_PATH`).
    #[arg(long, value_name = "PATH")]
    pub event: Option<PathBuf>,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Only check that the fork branch exists; change nothing and notify no one.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let config = self.source.load_config()?;
        let event = load_event(self.event.as_ref(), &config)?;

        let report = pipeline::run(&config, &event, self.dry_run)
            .with_context(|| format!("sync run for pull request #{} failed", event.pr_number))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize run report")?
            );
        } else {
            print_report(&report);
        }

        if let Some(SyncOutcome::Failed { reason }) = &report.outcome {
            bail!("sync of {} `{}` failed: {reason}", report.fork, report.base_branch);
        }
        if let (None, Some(err)) = (&report.outcome, &report.branch_check_error) {
            bail!("branch check for {} `{}` failed: {err}", report.fork, report.base_branch);
        }
        Ok(())
    }
}

fn print_report(report: &RunReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let target = format!("{} `{}`", report.fork, report.base_branch);

    if let Some(reason) = report.skipped {
        let line = match reason {
            SkipReason::NotMerged => format!(
                "pull request #{} was not merged; nothing to do",
                report.pr_number
            ),
            SkipReason::BranchMissing => format!("{target} does not exist; nothing to do"),
            SkipReason::DryRun => {
                format!("{target} exists; a run would sync it from {}", report.upstream)
            }
        };
        println!("{prefix}{} {line}", "·".bright_black());
        return;
    }

    match &report.outcome {
        Some(SyncOutcome::Synced { fork_url }) => {
            println!("{} {target} synced: {fork_url}", "✓".green());
        }
        Some(SyncOutcome::Created { pull_request }) => {
            println!(
                "{} {target} needs a manual merge: {pull_request}",
                "!".yellow()
            );
            if !report.conflicted_paths.is_empty() {
                println!("  conflicts:");
                for path in &report.conflicted_paths {
                    println!("    {path}");
                }
            }
        }
        Some(SyncOutcome::Failed { reason }) => {
            println!("{} {target} failed: {reason}", "✗".red());
        }
        None => {
            if let Some(err) = &report.branch_check_error {
                println!("{prefix}{} {target} branch check failed: {err}", "✗".red());
            }
        }
    }

    if let Some(err) = &report.notify_error {
        println!("  {} notification not delivered: {err}", "!".yellow());
    }
}
