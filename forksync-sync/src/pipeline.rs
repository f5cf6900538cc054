//! Shared run entrypoint used by `forksync run`.
//!
//! Builds the production collaborators from a [`SyncConfig`] and hands them to
//! the [`Orchestrator`]. Everything that can fail before the first side effect
//! (missing credentials, broken user templates) is returned as [`SyncError`].

use forksync_core::{CoreError, Secret, SyncConfig, TriggerEvent};
use forksync_renderer::MessageRenderer;

use crate::error::SyncError;
use crate::hosting::GitHubClient;
use crate::notify::SlackNotifier;
use crate::orchestrator::{self, Orchestrator, RunReport};
use crate::reconcile::GitReconciler;

/// Run the full pipeline for `event`.
///
/// With `dry_run` only the read-only branch check is performed and no
/// notification is sent.
pub fn run(
    config: &SyncConfig,
    event: &TriggerEvent,
    dry_run: bool,
) -> Result<RunReport, SyncError> {
    config.check_timeout()?;
    let timeout = config.http_timeout();
    if dry_run {
        let hosting = GitHubClient::new(&config.github_api_url, read_token(config)?, timeout);
        return Ok(orchestrator::plan(config, &hosting, event));
    }

    config.validate_for_run()?;
    let renderer = MessageRenderer::new(config.template_dir.as_deref())?;

    let fork_token = required(config.fork_token.as_ref(), "fork_token", "FORK_TOKEN")?;
    let slack_token = required(config.slack_token.as_ref(), "slack_token", "SLACK_TOKEN")?;
    let channel = config.slack_channel.clone().ok_or(CoreError::Missing {
        key: "slack_channel",
        env: "SLACK_CHANNEL_ID",
    })?;

    let hosting = GitHubClient::new(&config.github_api_url, fork_token.clone(), timeout);
    let reconciler = GitReconciler::new(config, fork_token);
    let notifier = SlackNotifier::new(&config.slack_api_url, slack_token, channel, timeout);

    tracing::info!(
        pr = event.pr_number,
        fork = %config.fork,
        branch = %config.base_branch_for(event),
        "starting sync run"
    );
    let report = Orchestrator::new(config, &renderer, hosting, reconciler, notifier).run(event);
    Ok(report)
}

/// Token for the dry-run branch check: the fork token, else the ambient one.
fn read_token(config: &SyncConfig) -> Result<Secret, CoreError> {
    config
        .fork_token
        .clone()
        .or_else(|| config.github_token.clone())
        .ok_or(CoreError::Missing {
            key: "fork_token",
            env: "FORK_TOKEN",
        })
}

fn required(
    secret: Option<&Secret>,
    key: &'static str,
    env: &'static str,
) -> Result<Secret, CoreError> {
    secret.cloned().ok_or(CoreError::Missing { key, env })
}

#[cfg(test)]
mod tests {
    use forksync_core::{BranchName, RepoSlug};

    use super::*;
    use crate::orchestrator::SkipReason;

    fn event(merged: bool) -> TriggerEvent {
        TriggerEvent {
            pr_number: 7,
            title: "Fix locale loader".into(),
            html_url: None,
            author: "alice".into(),
            actor: "alice".into(),
            head_branch: BranchName::from("fix-locale"),
            base_branch: BranchName::from("develop"),
            upstream: RepoSlug::new("opencrvs", "opencrvs-countryconfig"),
            merged,
            merged_at: None,
        }
    }

    fn live_config() -> SyncConfig {
        SyncConfig {
            fork_token: Some(Secret::new("ghp_fork")),
            slack_token: Some(Secret::new("xoxb-test")),
            slack_channel: Some("C0123".into()),
            // Unroutable so an accidental request fails fast instead of leaving the host.
            github_api_url: "http://127.0.0.1:9".into(),
            slack_api_url: "http://127.0.0.1:9".into(),
            http_timeout_secs: 1,
            ..SyncConfig::default()
        }
    }

    #[test]
    fn live_run_requires_fork_token() {
        let config = SyncConfig {
            fork_token: None,
            ..live_config()
        };
        let err = run(&config, &event(true), false).expect_err("missing token");
        assert!(matches!(
            err,
            SyncError::Core(CoreError::Missing { env: "FORK_TOKEN", .. })
        ));
    }

    #[test]
    fn live_run_requires_slack_channel() {
        let config = SyncConfig {
            slack_channel: None,
            ..live_config()
        };
        let err = run(&config, &event(true), false).expect_err("missing channel");
        assert!(matches!(
            err,
            SyncError::Core(CoreError::Missing { env: "SLACK_CHANNEL_ID", .. })
        ));
    }

    #[test]
    fn unmerged_event_is_skipped_without_side_effects() {
        let report = run(&live_config(), &event(false), false).expect("run");
        assert_eq!(report.skipped, Some(SkipReason::NotMerged));
        assert!(report.outcome.is_none());
        assert!(!report.notified);
    }

    #[test]
    fn dry_run_accepts_ambient_token() {
        let config = SyncConfig {
            fork_token: None,
            github_token: Some(Secret::new("ghs_ambient")),
            ..live_config()
        };
        let report = run(&config, &event(false), true).expect("dry run");
        assert!(report.dry_run);
        assert_eq!(report.skipped, Some(SkipReason::NotMerged));
    }

    #[test]
    fn dry_run_rejects_zero_timeout() {
        let config = SyncConfig {
            http_timeout_secs: 0,
            ..live_config()
        };
        let err = run(&config, &event(true), true).expect_err("zero timeout");
        assert!(matches!(
            err,
            SyncError::Core(CoreError::InvalidValue { key: "http_timeout_secs", .. })
        ));
    }

    #[test]
    fn dry_run_without_any_token_is_an_error() {
        let config = SyncConfig {
            fork_token: None,
            github_token: None,
            ..live_config()
        };
        assert!(run(&config, &event(true), true).is_err());
    }
}
