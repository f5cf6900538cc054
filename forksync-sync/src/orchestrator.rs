//! Sync orchestrator: one merge event in, at most one outcome and one
//! notification out.
//!
//! ## State machine
//!
//! ```text
//! Start ─► BranchChecked ─┬─ absent ─────────────────────────────► (done, silent)
//!                         └─► SyncAttempted ─┬─ ok ────────────────► Notified  [Synced]
//!                                            └─► MergeAttempted ─┬─ git error ► Notified [Failed]
//!                                                                └─► PrAttempted ─► Notified [Created | Failed]
//! ```
//!
//! Collaborator failures never escape [`Orchestrator::run`]; each one is
//! recorded in the [`RunReport`] and routed to the next fallback or to the
//! outcome.

use chrono::{DateTime, Utc};
use serde::Serialize;

use forksync_core::{
    BranchName, PullRequestRef, RepoSlug, Stage, SyncConfig, SyncOutcome, TriggerEvent,
};
use forksync_renderer::{MessageContext, MessageRenderer};

use crate::error::HostingError;
use crate::hosting::{HostingClient, NewPullRequest};
use crate::notify::Notifier;
use crate::reconcile::Reconciler;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Why a run ended without an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The pull request was closed without being merged.
    NotMerged,
    /// The target branch does not exist in the fork.
    BranchMissing,
    /// `--dry-run`: the branch exists, nothing was changed.
    DryRun,
}

/// Everything a run did, in order. Serialized for `forksync run --json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub pr_number: u64,
    pub upstream: RepoSlug,
    pub fork: RepoSlug,
    pub base_branch: BranchName,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stages: Vec<Stage>,
    pub skipped: Option<SkipReason>,
    pub branch_exists: Option<bool>,
    pub branch_check_error: Option<String>,
    pub sync_error: Option<String>,
    pub reconciliation_branch: Option<BranchName>,
    pub conflicted_paths: Vec<String>,
    pub outcome: Option<SyncOutcome>,
    pub notification: Option<String>,
    pub notified: bool,
    pub notify_error: Option<String>,
}

impl RunReport {
    fn new(
        event: &TriggerEvent,
        upstream: RepoSlug,
        fork: RepoSlug,
        base: BranchName,
        dry_run: bool,
    ) -> Self {
        Self {
            pr_number: event.pr_number,
            upstream,
            fork,
            base_branch: base,
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
            skipped: None,
            branch_exists: None,
            branch_check_error: None,
            sync_error: None,
            reconciliation_branch: None,
            conflicted_paths: Vec::new(),
            outcome: None,
            notification: None,
            notified: false,
            notify_error: None,
        }
    }

    /// Record entry into `stage`. Stages only move forward.
    fn advance(&mut self, stage: Stage) {
        debug_assert!(
            self.stages.last().map_or(true, |last| *last < stage),
            "stage {stage} entered after {:?}",
            self.stages.last()
        );
        tracing::debug!(%stage, "entered stage");
        self.stages.push(stage);
    }

    fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn reached(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Wires the injected collaborators into the five-step procedure.
pub struct Orchestrator<'a, H, R, N> {
    config: &'a SyncConfig,
    renderer: &'a MessageRenderer,
    hosting: H,
    reconciler: R,
    notifier: N,
}

impl<'a, H, R, N> Orchestrator<'a, H, R, N>
where
    H: HostingClient,
    R: Reconciler,
    N: Notifier,
{
    pub fn new(
        config: &'a SyncConfig,
        renderer: &'a MessageRenderer,
        hosting: H,
        reconciler: R,
        notifier: N,
    ) -> Self {
        Self {
            config,
            renderer,
            hosting,
            reconciler,
            notifier,
        }
    }

    /// Execute one run for `event`.
    pub fn run(&self, event: &TriggerEvent) -> RunReport {
        let upstream = self.config.upstream_for(event);
        let base = self.config.base_branch_for(event);
        let ctx = MessageContext::new(event, self.config, &upstream, &base);

        let mut report = check_branch(self.config, &self.hosting, event, false);
        if report.skipped.is_some() {
            return report.finish();
        }

        let outcome = match report.branch_exists {
            Some(true) => self.propagate(&mut report, &ctx, &upstream, &base),
            // The branch check itself failed; a human still has to hear about it.
            _ => SyncOutcome::Failed {
                reason: report
                    .branch_check_error
                    .clone()
                    .unwrap_or_else(|| "branch check failed".to_owned()),
            },
        };

        tracing::info!(outcome = outcome.label(), branch = %base, "run outcome");
        report.outcome = Some(outcome.clone());
        self.notify(&mut report, &ctx, &outcome);
        report.finish()
    }

    /// Steps 2 to 4: direct sync, then merge fallback and reconciliation PR.
    fn propagate(
        &self,
        report: &mut RunReport,
        ctx: &MessageContext,
        upstream: &RepoSlug,
        base: &BranchName,
    ) -> SyncOutcome {
        let fork = &self.config.fork;

        // Step 2
        let sync = self.hosting.sync_fork(fork, base);
        report.advance(Stage::SyncAttempted);
        match sync {
            Ok(()) => {
                tracing::info!(fork = %fork, branch = %base, "fork synced from upstream");
                return SyncOutcome::Synced {
                    fork_url: self.config.fork_branch_url(base),
                };
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    branch = %base,
                    "direct sync failed; falling back to manual merge"
                );
                report.sync_error = Some(err.to_string());
            }
        }

        // Step 3
        let merge = self.reconciler.reconcile(upstream, base);
        report.advance(Stage::MergeAttempted);
        let attempt = match merge {
            Ok(attempt) => attempt,
            Err(err) => {
                tracing::error!(error = %err, "manual merge fallback failed");
                return SyncOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };
        report.reconciliation_branch = Some(attempt.branch.clone());
        report.conflicted_paths = attempt.conflicted_paths.clone();

        // Step 4
        let ctx = ctx.clone().with_conflicts(attempt.conflicted());
        let request = match self.pull_request_for(&ctx, &attempt.branch, base) {
            Ok(request) => request,
            Err(reason) => return SyncOutcome::Failed { reason },
        };
        let created = self.hosting.create_pull_request(fork, &request);
        report.advance(Stage::PrAttempted);
        match created {
            Ok(pull_request) => {
                tracing::info!(pr = %pull_request, "opened reconciliation pull request");
                SyncOutcome::Created { pull_request }
            }
            Err(HostingError::PullRequestExists { existing }) => {
                let pull_request =
                    existing.unwrap_or_else(|| self.pulls_search_ref(&attempt.branch));
                tracing::info!(pr = %pull_request, "reconciliation pull request already open");
                SyncOutcome::Created { pull_request }
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to open reconciliation pull request");
                SyncOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn pull_request_for(
        &self,
        ctx: &MessageContext,
        head: &BranchName,
        base: &BranchName,
    ) -> Result<NewPullRequest, String> {
        let title = self.renderer.pr_title(ctx).map_err(|e| e.to_string())?;
        let body = self.renderer.pr_body(ctx).map_err(|e| e.to_string())?;
        Ok(NewPullRequest {
            head: head.clone(),
            base: base.clone(),
            title,
            body,
        })
    }

    /// Reference used when the host reports an existing PR it cannot name.
    fn pulls_search_ref(&self, head: &BranchName) -> PullRequestRef {
        PullRequestRef {
            number: None,
            url: format!(
                "{}/pulls?q=is%3Apr+is%3Aopen+head%3A{}",
                self.config.fork.web_url(&self.config.github_web_url),
                head
            ),
        }
    }

    /// Step 5. Delivery failure is recorded, never raised.
    fn notify(&self, report: &mut RunReport, ctx: &MessageContext, outcome: &SyncOutcome) {
        let text = match self.renderer.notification(ctx, outcome) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(error = %err, "failed to render notification");
                report.notify_error = Some(err.to_string());
                report.advance(Stage::Notified);
                return;
            }
        };

        match self.notifier.post(&text) {
            Ok(()) => {
                tracing::info!("notification delivered");
                report.notified = true;
            }
            Err(err) => {
                tracing::error!(error = %err, "notification delivery failed");
                report.notify_error = Some(err.to_string());
            }
        }
        report.notification = Some(text);
        report.advance(Stage::Notified);
    }
}

/// Step 1 on its own: the merged-only filter and the branch existence check.
///
/// With `dry_run` an existing branch ends the run as [`SkipReason::DryRun`];
/// otherwise the report is left open for the remaining steps. A failed check
/// leaves `branch_exists` unset and records the error text.
pub fn check_branch<H: HostingClient>(
    config: &SyncConfig,
    hosting: &H,
    event: &TriggerEvent,
    dry_run: bool,
) -> RunReport {
    let upstream = config.upstream_for(event);
    let base = config.base_branch_for(event);
    let mut report = RunReport::new(event, upstream, config.fork.clone(), base.clone(), dry_run);
    report.advance(Stage::Start);

    if !event.merged {
        tracing::info!(pr = event.pr_number, "pull request was not merged; nothing to do");
        report.skipped = Some(SkipReason::NotMerged);
        return report;
    }

    match hosting.branch_exists(&config.fork, &base) {
        Ok(exists) => {
            report.advance(Stage::BranchChecked);
            report.branch_exists = Some(exists);
            if !exists {
                tracing::info!(fork = %config.fork, branch = %base, "branch absent in fork; skipping");
                report.skipped = Some(SkipReason::BranchMissing);
            } else if dry_run {
                tracing::info!(fork = %config.fork, branch = %base, "[dry-run] would sync branch");
                report.skipped = Some(SkipReason::DryRun);
            }
        }
        Err(err) => {
            tracing::error!(error = %err, branch = %base, "branch existence check failed");
            report.branch_check_error = Some(err.to_string());
        }
    }
    report
}

/// Read-only plan for `--dry-run`.
pub fn plan<H: HostingClient>(config: &SyncConfig, hosting: &H, event: &TriggerEvent) -> RunReport {
    check_branch(config, hosting, event, true).finish()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
