//! Trigger event: the merged pull request that starts a run.
//!
//! The CI platform writes the webhook payload to a JSON file (its path is in
//! `GITHUB_EVENT_PATH`). Only the fields the orchestrator needs are read;
//! everything else in the payload is ignored.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::types::{BranchName, RepoSlug};

/// The merged pull request, flattened to what a run consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerEvent {
    pub pr_number: u64,
    pub title: String,
    pub html_url: Option<String>,
    /// Login of the pull request's author.
    pub author: String,
    /// Login of whoever triggered the event (usually the merger).
    pub actor: String,
    /// Source branch of the merged PR.
    pub head_branch: BranchName,
    /// Target branch of the merged PR; the branch propagated downstream.
    pub base_branch: BranchName,
    /// Repository the PR was merged into.
    pub upstream: RepoSlug,
    pub merged: bool,
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    action: Option<String>,
    pull_request: RawPullRequest,
    #[serde(default)]
    repository: Option<RawRepo>,
    #[serde(default)]
    sender: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    merged_at: Option<DateTime<Utc>>,
    user: RawUser,
    head: RawRef,
    base: RawRef,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    #[serde(rename = "ref")]
    git_ref: String,
    #[serde(default)]
    repo: Option<RawRepo>,
}

#[derive(Debug, Deserialize)]
struct RawRepo {
    full_name: RepoSlug,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

impl TriggerEvent {
    /// Parse a pull_request webhook payload.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawEvent = serde_json::from_str(json)?;
        let pr = raw.pull_request;

        let upstream = pr
            .base
            .repo
            .or(raw.repository)
            .map(|r| r.full_name)
            .ok_or_else(|| {
                <serde_json::Error as serde::de::Error>::custom(
                    "payload has neither pull_request.base.repo nor repository",
                )
            })?;

        let actor = raw
            .sender
            .map(|s| s.login)
            .unwrap_or_else(|| pr.user.login.clone());

        // A payload that says "closed" without "merged" stays unmerged; one
        // with no action at all (hand-written fixtures) trusts `merged`.
        let merged = pr.merged && raw.action.as_deref().map_or(true, |a| a == "closed");

        Ok(Self {
            pr_number: pr.number,
            title: pr.title,
            html_url: pr.html_url,
            author: pr.user.login,
            actor,
            head_branch: BranchName(pr.head.git_ref),
            base_branch: BranchName(pr.base.git_ref),
            upstream,
            merged,
            merged_at: pr.merged_at,
        })
    }

    /// Read and parse the payload at `path`.
    pub fn load_at(path: &Path) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        Self::from_json(&contents).map_err(|source| CoreError::Event {
            path: path.to_path_buf(),
            source,
        })
    }
}
