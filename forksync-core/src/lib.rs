//! forksync core library: domain types, trigger event, configuration and errors.
//!
//! - [`types`]: newtypes, outcome and stage enums
//! - [`event`]: merged pull-request trigger payload
//! - [`config`]: layered [`SyncConfig`] (defaults → YAML → environment)
//! - [`error`]: [`CoreError`]

pub mod config;
pub mod error;
pub mod event;
pub mod types;

pub use config::{Secret, SyncConfig};
pub use error::CoreError;
pub use event::TriggerEvent;
pub use types::{BranchName, PullRequestRef, RepoSlug, Stage, SyncOutcome};
