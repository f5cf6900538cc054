//! # forksync-sync
//!
//! Propagates a merged upstream pull request into the downstream fork.
//!
//! Call [`pipeline::run`] with a loaded [`forksync_core::SyncConfig`] and a
//! [`forksync_core::TriggerEvent`] to execute one run with the real GitHub,
//! git and Slack collaborators. [`Orchestrator`] takes the collaborators as
//! generic parameters so tests can script every step.

pub mod error;
pub mod exec;
pub mod git;
pub mod hosting;
pub mod notify;
pub mod orchestrator;
pub mod pipeline;
pub mod reconcile;

pub use error::{GitError, HostingError, NotifyError, SyncError};
pub use hosting::{GitHubClient, HostingClient, NewPullRequest};
pub use notify::{Notifier, SlackNotifier};
pub use orchestrator::{Orchestrator, RunReport, SkipReason};
pub use reconcile::{GitReconciler, MergeAttempt, Reconciler};
