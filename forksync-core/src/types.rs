//! Domain types shared across forksync crates.
//!
//! Branch and repository identifiers are newtypes so the orchestrator can never
//! confuse an upstream slug with a fork slug or a base branch with the
//! reconciliation branch.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Prefix of the branch created on the merge-fallback path.
pub const RECONCILIATION_PREFIX: &str = "sync-with-";

/// A git branch name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(pub String);

impl BranchName {
    /// The reconciliation branch for this base branch: `sync-with-<base>`.
    pub fn reconciliation(&self) -> BranchName {
        BranchName(format!("{RECONCILIATION_PREFIX}{}", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for BranchName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BranchName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A GitHub repository identifier, `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// `https://github.com/<owner>/<name>` style web URL under `web_base`.
    pub fn web_url(&self, web_base: &str) -> String {
        format!("{}/{}/{}", web_base.trim_end_matches('/'), self.owner, self.name)
    }

    /// Clone URL (`<web_base>/<owner>/<name>.git`).
    pub fn clone_url(&self, web_base: &str) -> String {
        format!("{}.git", self.web_url(web_base))
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoSlug {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(CoreError::InvalidRepo(s.to_owned())),
        }
    }
}

impl Serialize for RepoSlug {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RepoSlug {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Reference to a pull request in the downstream fork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    /// `None` when the PR is known to exist but its number could not be looked up.
    pub number: Option<u64>,
    pub url: String,
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.number {
            Some(n) => write!(f, "#{n} ({})", self.url),
            None => self.url.fmt(f),
        }
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Terminal outcome of a run. Set exactly once, consumed by the notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SyncOutcome {
    /// The fork branch was synced directly from upstream.
    Synced { fork_url: String },
    /// A reconciliation PR exists (new or pre-existing) and needs a manual merge.
    Created { pull_request: PullRequestRef },
    /// The run could not complete; `reason` is the raw error text.
    Failed { reason: String },
}

impl SyncOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Synced { .. } => "synced",
            SyncOutcome::Created { .. } => "created",
            SyncOutcome::Failed { .. } => "failed",
        }
    }
}

/// Orchestrator states, in the order a full run traverses them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    BranchChecked,
    SyncAttempted,
    MergeAttempted,
    PrAttempted,
    Notified,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Start => "start",
            Stage::BranchChecked => "branch_checked",
            Stage::SyncAttempted => "sync_attempted",
            Stage::MergeAttempted => "merge_attempted",
            Stage::PrAttempted => "pr_attempted",
            Stage::Notified => "notified",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconciliation_branch_name() {
        let base = BranchName::from("release-2.1");
        assert_eq!(base.reconciliation().to_string(), "sync-with-release-2.1");
    }

    #[test]
    fn repo_slug_parse_and_display() {
        let slug: RepoSlug = "opencrvs/opencrvs-farajaland".parse().expect("parse");
        assert_eq!(slug.owner, "opencrvs");
        assert_eq!(slug.name, "opencrvs-farajaland");
        assert_eq!(slug.to_string(), "opencrvs/opencrvs-farajaland");
    }

    #[test]
    fn repo_slug_rejects_malformed() {
        for bad in ["", "noslash", "/name", "owner/", "a/b/c"] {
            assert!(bad.parse::<RepoSlug>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn repo_slug_urls() {
        let slug = RepoSlug::new("org", "repo");
        assert_eq!(slug.web_url("https://github.com/"), "https://github.com/org/repo");
        assert_eq!(slug.clone_url("https://github.com"), "https://github.com/org/repo.git");
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = SyncOutcome::Failed {
            reason: "boom".into(),
        };
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "boom");
    }

    #[test]
    fn pull_request_ref_display() {
        let pr = PullRequestRef {
            number: Some(12),
            url: "https://github.com/o/r/pull/12".into(),
        };
        assert_eq!(pr.to_string(), "#12 (https://github.com/o/r/pull/12)");
    }
}
