//! Error types for forksync-sync.
//!
//! Collaborator errors ([`GitError`], [`HostingError`], [`NotifyError`]) are
//! captured by the orchestrator and turned into outcome state. [`SyncError`] is
//! reserved for setup failures that happen before any side effect.

use std::path::PathBuf;

use thiserror::Error;

use forksync_core::{CoreError, PullRequestRef};
use forksync_renderer::RenderError;

/// Failures from the `git` CLI. Command lines and stderr are already redacted.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run `{command}`: {message}")]
    SpawnFailed { command: String, message: String },

    #[error("`{command}` failed with code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The scratch directory for the clone could not be created.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures from the hosting (GitHub) API.
#[derive(Debug, Error)]
pub enum HostingError {
    /// A pull request for the same head/base pair is already open.
    #[error("a pull request already exists for this branch")]
    PullRequestExists { existing: Option<PullRequestRef> },

    /// The API answered with a non-success status; `message` is its error text.
    #[error("GitHub API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("GitHub API request failed: {0}")]
    Transport(String),

    #[error("invalid GitHub API URL: {0}")]
    InvalidUrl(String),

    #[error("unexpected GitHub API response: {0}")]
    Decode(String),
}

/// Failures delivering the chat notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Slack API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Slack answered 200 with `ok: false`.
    #[error("Slack rejected the message: {0}")]
    Rejected(String),

    #[error("Slack request failed: {0}")]
    Transport(String),

    #[error("unexpected Slack response: {0}")]
    Decode(String),
}

/// Setup errors that abort a run before the orchestrator starts.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Core(#[from] CoreError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> GitError {
    GitError::Io {
        path: path.into(),
        source,
    }
}
