//! Run configuration.
//!
//! # Layering
//!
//! ```text
//! defaults  <  YAML file (--config)  <  environment
//! ```
//!
//! The environment is passed in as a map rather than read from the process so
//! tests can build any configuration deterministically. Empty environment
//! values count as unset; CI platforms export empty strings for missing secrets.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::event::TriggerEvent;
use crate::types::{BranchName, RepoSlug};

pub const DEFAULT_FORK_OWNER: &str = "opencrvs";
pub const DEFAULT_FORK_NAME: &str = "opencrvs-farajaland";
pub const DEFAULT_FORK_DISPLAY_NAME: &str = "Farajaland";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_WEB_URL: &str = "https://github.com";
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
pub const DEFAULT_GIT_USER_NAME: &str = "github-actions[bot]";
pub const DEFAULT_GIT_USER_EMAIL: &str = "41898282+github-actions[bot]@users.noreply.github.com";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Secret
// ---------------------------------------------------------------------------

/// A token that never appears in `Debug`, `Display` or serialized output.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token. Only HTTP headers and git credential URLs should see this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl Serialize for Secret {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("****")
    }
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Fully resolved configuration injected into the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncConfig {
    /// Overrides the event's repository when set.
    pub upstream: Option<RepoSlug>,
    /// Overrides the event's base branch when set.
    pub base_branch: Option<BranchName>,
    pub fork: RepoSlug,
    pub fork_display_name: String,
    /// Token scoped to the downstream fork: API calls, clone and push.
    pub fork_token: Option<Secret>,
    /// Ambient platform token, used to fetch the upstream repository.
    pub github_token: Option<Secret>,
    pub slack_token: Option<Secret>,
    pub slack_channel: Option<String>,
    pub git_user_name: String,
    pub git_user_email: String,
    pub github_api_url: String,
    pub github_web_url: String,
    pub slack_api_url: String,
    pub http_timeout_secs: u64,
    pub template_dir: Option<PathBuf>,
    pub event_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            upstream: None,
            base_branch: None,
            fork: RepoSlug::new(DEFAULT_FORK_OWNER, DEFAULT_FORK_NAME),
            fork_display_name: DEFAULT_FORK_DISPLAY_NAME.to_owned(),
            fork_token: None,
            github_token: None,
            slack_token: None,
            slack_channel: None,
            git_user_name: DEFAULT_GIT_USER_NAME.to_owned(),
            git_user_email: DEFAULT_GIT_USER_EMAIL.to_owned(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_owned(),
            github_web_url: DEFAULT_GITHUB_WEB_URL.to_owned(),
            slack_api_url: DEFAULT_SLACK_API_URL.to_owned(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            template_dir: None,
            event_path: None,
        }
    }
}

/// On-disk YAML shape. Every field is optional; absent fields keep defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    upstream: Option<RepoSlug>,
    base_branch: Option<BranchName>,
    fork: Option<RepoSlug>,
    fork_display_name: Option<String>,
    fork_token: Option<Secret>,
    github_token: Option<Secret>,
    slack_token: Option<Secret>,
    slack_channel: Option<String>,
    git_user_name: Option<String>,
    git_user_email: Option<String>,
    github_api_url: Option<String>,
    github_web_url: Option<String>,
    slack_api_url: Option<String>,
    http_timeout_secs: Option<u64>,
    template_dir: Option<PathBuf>,
}

impl SyncConfig {
    /// Resolve configuration from defaults, an optional YAML file and `env`.
    pub fn load(file: Option<&Path>, env: &HashMap<String, String>) -> Result<Self, CoreError> {
        let mut config = Self::default();
        if let Some(path) = file {
            config.apply_file(path)?;
        }
        config.apply_env(env)?;
        config.check_timeout()?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), CoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|source| CoreError::Config {
                path: path.to_path_buf(),
                source,
            })?
        };

        set(&mut self.upstream, file.upstream.map(Some));
        set(&mut self.base_branch, file.base_branch.map(Some));
        set(&mut self.fork, file.fork);
        set(&mut self.fork_display_name, file.fork_display_name);
        set(&mut self.fork_token, file.fork_token.map(Some));
        set(&mut self.github_token, file.github_token.map(Some));
        set(&mut self.slack_token, file.slack_token.map(Some));
        set(&mut self.slack_channel, file.slack_channel.map(Some));
        set(&mut self.git_user_name, file.git_user_name);
        set(&mut self.git_user_email, file.git_user_email);
        set(&mut self.github_api_url, file.github_api_url);
        set(&mut self.github_web_url, file.github_web_url);
        set(&mut self.slack_api_url, file.slack_api_url);
        set(&mut self.http_timeout_secs, file.http_timeout_secs);

        // Relative template dirs are relative to the config file, not the cwd.
        if let Some(dir) = file.template_dir {
            let dir = match path.parent() {
                Some(parent) if dir.is_relative() => parent.join(dir),
                _ => dir,
            };
            self.template_dir = Some(dir);
        }
        Ok(())
    }

    fn apply_env(&mut self, env: &HashMap<String, String>) -> Result<(), CoreError> {
        let get = |key: &str| {
            env.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };

        if let Some(v) = get("UPSTREAM_REPOSITORY") {
            self.upstream = Some(v.parse()?);
        }
        if let Some(v) = get("BASE_BRANCH") {
            self.base_branch = Some(BranchName(v));
        }
        if let Some(owner) = get("FORK_OWNER") {
            self.fork.owner = owner;
        }
        if let Some(name) = get("FORK_REPO") {
            self.fork.name = name;
        }
        set(&mut self.fork_display_name, get("FORK_DISPLAY_NAME"));
        if let Some(v) = get("FORK_TOKEN").or_else(|| get("GH_TOKEN")) {
            self.fork_token = Some(Secret(v));
        }
        if let Some(v) = get("GITHUB_TOKEN") {
            self.github_token = Some(Secret(v));
        }
        if let Some(v) = get("SLACK_TOKEN") {
            self.slack_token = Some(Secret(v));
        }
        set(&mut self.slack_channel, get("SLACK_CHANNEL_ID").map(Some));
        set(&mut self.git_user_name, get("GIT_AUTHOR_NAME"));
        set(&mut self.git_user_email, get("GIT_AUTHOR_EMAIL"));
        set(&mut self.github_api_url, get("GITHUB_API_URL"));
        set(&mut self.github_web_url, get("GITHUB_SERVER_URL"));
        set(&mut self.slack_api_url, get("SLACK_API_URL"));
        if let Some(v) = get("FORKSYNC_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = v.parse().map_err(|e| CoreError::InvalidValue {
                key: "FORKSYNC_HTTP_TIMEOUT_SECS",
                message: format!("{e}"),
            })?;
        }
        set(&mut self.template_dir, get("FORKSYNC_TEMPLATE_DIR").map(|v| Some(PathBuf::from(v))));
        set(&mut self.event_path, get("GITHUB_EVENT_PATH").map(|v| Some(PathBuf::from(v))));
        Ok(())
    }

    /// Check the settings a live (non-dry) run cannot do without.
    pub fn validate_for_run(&self) -> Result<(), CoreError> {
        if self.fork_token.is_none() {
            return Err(CoreError::Missing {
                key: "fork_token",
                env: "FORK_TOKEN",
            });
        }
        if self.slack_token.is_none() {
            return Err(CoreError::Missing {
                key: "slack_token",
                env: "SLACK_TOKEN",
            });
        }
        if self.slack_channel.is_none() {
            return Err(CoreError::Missing {
                key: "slack_channel",
                env: "SLACK_CHANNEL_ID",
            });
        }
        self.check_timeout()
    }

    /// A zero timeout would leave every HTTP call without a deadline.
    pub fn check_timeout(&self) -> Result<(), CoreError> {
        if self.http_timeout_secs == 0 {
            return Err(CoreError::InvalidValue {
                key: "http_timeout_secs",
                message: "must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }

    /// Upstream repository for `event`: the configured override or the event's own.
    pub fn upstream_for(&self, event: &TriggerEvent) -> RepoSlug {
        self.upstream.clone().unwrap_or_else(|| event.upstream.clone())
    }

    /// Branch to propagate for `event`: the configured override or the PR's base.
    pub fn base_branch_for(&self, event: &TriggerEvent) -> BranchName {
        self.base_branch
            .clone()
            .unwrap_or_else(|| event.base_branch.clone())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Web URL of the fork branch, used in the success notification.
    pub fn fork_branch_url(&self, branch: &BranchName) -> String {
        format!("{}/tree/{}", self.fork.web_url(&self.github_web_url), branch)
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
