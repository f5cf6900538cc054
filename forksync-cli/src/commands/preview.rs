//! `forksync preview`: render every text a run could produce for an event.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use forksync_core::{PullRequestRef, SyncOutcome};
use forksync_renderer::{MessageContext, MessageRenderer};

use super::{load_event, SourceArgs};

/// Arguments for `forksync preview`.
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Pull request event payload (defaults to `GITHUB_EVENT_PATH`).
    #[arg(long, value_name = "PATH")]
    pub event: Option<PathBuf>,

    #[command(flatten)]
    pub source: SourceArgs,
}

impl PreviewArgs {
    pub fn run(self) -> Result<()> {
        let config = self.source.load_config()?;
        let event = load_event(self.event.as_ref(), &config)?;
        let renderer = MessageRenderer::new(config.template_dir.as_deref())
            .context("failed to load message templates")?;

        let upstream = config.upstream_for(&event);
        let base = config.base_branch_for(&event);
        let ctx = MessageContext::new(&event, &config, &upstream, &base);

        section("pull request title");
        println!("{}", renderer.pr_title(&ctx)?);

        section("pull request body (clean merge)");
        println!("{}", renderer.pr_body(&ctx)?);

        section("pull request body (conflicts)");
        println!("{}", renderer.pr_body(&ctx.clone().with_conflicts(true))?);

        let compare_url = format!(
            "{}/compare/{}...{}",
            config.fork.web_url(&config.github_web_url),
            base,
            base.reconciliation()
        );
        let outcomes = [
            SyncOutcome::Synced {
                fork_url: config.fork_branch_url(&base),
            },
            SyncOutcome::Created {
                pull_request: PullRequestRef {
                    number: None,
                    url: compare_url,
                },
            },
            SyncOutcome::Failed {
                reason: "<error text from GitHub or git>".to_owned(),
            },
        ];
        for outcome in &outcomes {
            section(&format!("notification ({})", outcome.label()));
            println!("{}", renderer.notification(&ctx, outcome)?);
        }
        Ok(())
    }
}

fn section(title: &str) {
    println!("{}", format!("── {title} ──").bold());
}
