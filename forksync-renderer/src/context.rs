//! Message context: the serializable payload every template renders from.

use serde::{Deserialize, Serialize};

use forksync_core::{BranchName, RepoSlug, SyncConfig, SyncOutcome, TriggerEvent};

use crate::error::RenderError;

/// Flat rendering payload built from the trigger event and run configuration.
///
/// `outcome` is only populated when rendering a notification status line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContext {
    pub pr_number: u64,
    pub pr_title: String,
    pub pr_url: Option<String>,
    pub author: String,
    pub actor: String,
    pub head_branch: String,
    pub base_branch: String,
    pub reconciliation_branch: String,
    pub merged_at: Option<String>,
    pub upstream: String,
    pub upstream_url: String,
    pub fork: String,
    pub fork_display_name: String,
    pub fork_url: String,
    /// Whether the fallback merge left conflict markers behind.
    pub conflicted: bool,
    pub outcome: Option<OutcomeCtx>,
}

/// Outcome-specific fields. Absent values serialize as `null` so templates can
/// test them with `{% if %}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeCtx {
    pub status: String,
    pub fork_url: Option<String>,
    pub pull_request_url: Option<String>,
    pub pull_request_number: Option<u64>,
    pub reason: Option<String>,
}

impl From<&SyncOutcome> for OutcomeCtx {
    fn from(outcome: &SyncOutcome) -> Self {
        let mut ctx = OutcomeCtx {
            status: outcome.label().to_owned(),
            fork_url: None,
            pull_request_url: None,
            pull_request_number: None,
            reason: None,
        };
        match outcome {
            SyncOutcome::Synced { fork_url } => ctx.fork_url = Some(fork_url.clone()),
            SyncOutcome::Created { pull_request } => {
                ctx.pull_request_url = Some(pull_request.url.clone());
                ctx.pull_request_number = pull_request.number;
            }
            SyncOutcome::Failed { reason } => ctx.reason = Some(reason.clone()),
        }
        ctx
    }
}

impl MessageContext {
    /// Build the context for one run.
    ///
    /// `upstream` and `base` are passed explicitly because configuration may
    /// override what the event carries.
    pub fn new(
        event: &TriggerEvent,
        config: &SyncConfig,
        upstream: &RepoSlug,
        base: &BranchName,
    ) -> Self {
        MessageContext {
            pr_number: event.pr_number,
            pr_title: event.title.clone(),
            pr_url: event.html_url.clone(),
            author: event.author.clone(),
            actor: event.actor.clone(),
            head_branch: event.head_branch.to_string(),
            base_branch: base.to_string(),
            reconciliation_branch: base.reconciliation().to_string(),
            merged_at: event
                .merged_at
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string()),
            upstream: upstream.to_string(),
            upstream_url: upstream.web_url(&config.github_web_url),
            fork: config.fork.to_string(),
            fork_display_name: config.fork_display_name.clone(),
            fork_url: config.fork.web_url(&config.github_web_url),
            conflicted: false,
            outcome: None,
        }
    }

    pub fn with_conflicts(mut self, conflicted: bool) -> Self {
        self.conflicted = conflicted;
        self
    }

    pub fn with_outcome(mut self, outcome: &SyncOutcome) -> Self {
        self.outcome = Some(OutcomeCtx::from(outcome));
        self
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}
