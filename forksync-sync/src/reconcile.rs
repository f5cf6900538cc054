//! Manual merge fallback.
//!
//! When the hosting API cannot sync the fork directly, [`GitReconciler`] clones
//! the fork, merges the upstream branch into `sync-with-<base>` and pushes it.
//! A conflicted merge is still committed and pushed, markers and all, so a
//! human can finish it in the reconciliation pull request.
//!
//! An existing `sync-with-<base>` on the fork is built on, not replaced, and
//! the push is never forced. Commits a human added to the branch survive.

use std::path::PathBuf;

use forksync_core::{BranchName, RepoSlug, Secret, SyncConfig};

use crate::error::{io_err, GitError};
use crate::exec::{CommandExecutor, ProcessCommandExecutor};
use crate::git::{authenticated_prefix, GitWorker};

pub const UPSTREAM_REMOTE: &str = "upstream";
pub const FORK_REMOTE: &str = "origin";

/// Result of a fallback merge. The branch has been pushed when this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeAttempt {
    pub branch: BranchName,
    pub conflicted_paths: Vec<String>,
}

impl MergeAttempt {
    pub fn conflicted(&self) -> bool {
        !self.conflicted_paths.is_empty()
    }
}

/// Commit message used when the merge leaves conflicts behind.
pub fn conflict_commit_message(base: &BranchName) -> String {
    format!(
        "Merge {UPSTREAM_REMOTE}/{base} into {} with conflicts",
        base.reconciliation()
    )
}

pub trait Reconciler {
    /// Merge `upstream`'s `base` into the fork's `sync-with-<base>` branch,
    /// creating it from `base` when absent, and push it. Merge conflicts are
    /// not an error.
    fn reconcile(&self, upstream: &RepoSlug, base: &BranchName) -> Result<MergeAttempt, GitError>;
}

impl<T: Reconciler + ?Sized> Reconciler for &T {
    fn reconcile(&self, upstream: &RepoSlug, base: &BranchName) -> Result<MergeAttempt, GitError> {
        (**self).reconcile(upstream, base)
    }
}

/// [`Reconciler`] backed by the `git` CLI in a scratch directory.
pub struct GitReconciler<E = ProcessCommandExecutor> {
    executor: E,
    fork: RepoSlug,
    web_base: String,
    fork_token: Secret,
    upstream_token: Option<Secret>,
    user_name: String,
    user_email: String,
    scratch_root: Option<PathBuf>,
}

impl GitReconciler<ProcessCommandExecutor> {
    pub fn new(config: &SyncConfig, fork_token: Secret) -> Self {
        Self::with_executor(config, fork_token, ProcessCommandExecutor)
    }
}

impl<E: CommandExecutor> GitReconciler<E> {
    pub fn with_executor(config: &SyncConfig, fork_token: Secret, executor: E) -> Self {
        Self {
            executor,
            fork: config.fork.clone(),
            web_base: config.github_web_url.trim_end_matches('/').to_owned(),
            fork_token,
            upstream_token: config.github_token.clone(),
            user_name: config.git_user_name.clone(),
            user_email: config.git_user_email.clone(),
            scratch_root: None,
        }
    }

    /// Create scratch clones under `dir` instead of the system temp dir.
    pub fn scratch_in(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    fn scratch_dir(&self) -> Result<tempfile::TempDir, GitError> {
        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("forksync-");
            b
        };
        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root).map_err(|e| io_err(root, e)),
            None => builder
                .tempdir()
                .map_err(|e| io_err(std::env::temp_dir(), e)),
        }
    }

    /// URL the `upstream` remote is added with. The ambient token, when present,
    /// is embedded directly so the fork credential rewrite does not apply to it.
    fn upstream_url(&self, upstream: &RepoSlug) -> String {
        match &self.upstream_token {
            Some(token) => format!(
                "{}{}/{}.git",
                authenticated_prefix(&self.web_base, token.expose()),
                upstream.owner,
                upstream.name
            ),
            None => upstream.clone_url(&self.web_base),
        }
    }
}

impl<E: CommandExecutor> Reconciler for GitReconciler<E> {
    fn reconcile(&self, upstream: &RepoSlug, base: &BranchName) -> Result<MergeAttempt, GitError> {
        let scratch = self.scratch_dir()?;
        let mut git = GitWorker::with_executor(scratch.path().join("fork"), &self.executor)
            .redacting(self.fork_token.expose());
        if let Some(token) = &self.upstream_token {
            git = git.redacting(token.expose());
        }

        let rewrite_key = format!(
            "url.{}.insteadOf",
            authenticated_prefix(&self.web_base, self.fork_token.expose())
        );
        let rewrite_value = format!("{}/", self.web_base);

        // a. full-history clone of the fork branch
        git.clone_branch(
            &self.fork.clone_url(&self.web_base),
            base.as_str(),
            &[(rewrite_key.clone(), rewrite_value.clone())],
        )?;

        // b. identity + credential rewrite for the remaining operations
        git.config("user.name", &self.user_name)?;
        git.config("user.email", &self.user_email)?;
        git.config(&rewrite_key, &rewrite_value)?;

        // c. upstream remote
        git.remote_add(UPSTREAM_REMOTE, &self.upstream_url(upstream))?;
        git.fetch(UPSTREAM_REMOTE)?;

        // d. reconciliation branch, continuing the fork's copy when it exists
        let branch = base.reconciliation();
        if git.remote_branch_exists(FORK_REMOTE, branch.as_str())? {
            tracing::info!(branch = %branch, "reusing existing reconciliation branch");
            git.fetch_branch(FORK_REMOTE, branch.as_str())?;
            let start = format!("{FORK_REMOTE}/{branch}");
            git.checkout_new_branch(branch.as_str(), Some(&start))?;
        } else {
            git.checkout_new_branch(branch.as_str(), None)?;
        }

        // e./f. merge, committing conflicts as-is
        let upstream_ref = format!("{UPSTREAM_REMOTE}/{base}");
        let mut conflicted_paths = Vec::new();
        if let Err(merge_err) = git.merge(&upstream_ref) {
            conflicted_paths = git.conflicted_paths()?;
            if conflicted_paths.is_empty() {
                return Err(merge_err);
            }
            tracing::warn!(
                branch = %branch,
                conflicts = conflicted_paths.len(),
                "merge produced conflicts; committing markers for manual resolution"
            );
            git.add_all()?;
            git.commit(&conflict_commit_message(base))?;
        }

        // g. publish. A concurrent update of the branch is rejected as
        // non-fast-forward and surfaces as an error.
        git.push(FORK_REMOTE, branch.as_str())?;
        tracing::info!(branch = %branch, fork = %self.fork, "pushed reconciliation branch");

        Ok(MergeAttempt {
            branch,
            conflicted_paths,
        })
    }
}
