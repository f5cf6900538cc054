//! Hosting API seam and its GitHub REST implementation.
//!
//! # Endpoints
//!
//! | Operation              | Request                                        |
//! |------------------------|------------------------------------------------|
//! | branch exists          | `GET  /repos/{fork}/branches/{branch}`         |
//! | sync fork              | `POST /repos/{fork}/merge-upstream`            |
//! | create pull request    | `POST /repos/{fork}/pulls`                     |
//! | find open pull request | `GET  /repos/{fork}/pulls?head=&base=&state=open` |

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use url::Url;

use forksync_core::{BranchName, PullRequestRef, RepoSlug, Secret};

use crate::error::HostingError;

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("forksync/", env!("CARGO_PKG_VERSION"));

/// Shim for hosts whose 422 response cannot be confirmed with a lookup.
const ALREADY_EXISTS_MARKER: &str = "a pull request already exists";

/// Parameters of the reconciliation pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub head: BranchName,
    pub base: BranchName,
    pub title: String,
    pub body: String,
}

pub trait HostingClient {
    fn branch_exists(&self, repo: &RepoSlug, branch: &BranchName) -> Result<bool, HostingError>;

    /// Fast-forward `branch` of the fork from its upstream. Any failure,
    /// including diverged history, is returned as an error.
    fn sync_fork(&self, repo: &RepoSlug, branch: &BranchName) -> Result<(), HostingError>;

    /// Open a PR. An already-open PR for the same head/base is reported as
    /// [`HostingError::PullRequestExists`], never as a generic failure.
    fn create_pull_request(
        &self,
        repo: &RepoSlug,
        request: &NewPullRequest,
    ) -> Result<PullRequestRef, HostingError>;
}

impl<T: HostingClient + ?Sized> HostingClient for &T {
    fn branch_exists(&self, repo: &RepoSlug, branch: &BranchName) -> Result<bool, HostingError> {
        (**self).branch_exists(repo, branch)
    }

    fn sync_fork(&self, repo: &RepoSlug, branch: &BranchName) -> Result<(), HostingError> {
        (**self).sync_fork(repo, branch)
    }

    fn create_pull_request(
        &self,
        repo: &RepoSlug,
        request: &NewPullRequest,
    ) -> Result<PullRequestRef, HostingError> {
        (**self).create_pull_request(repo, request)
    }
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
}

impl From<PullResponse> for PullRequestRef {
    fn from(p: PullResponse) -> Self {
        PullRequestRef {
            number: Some(p.number),
            url: p.html_url,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// GitHub REST client over a blocking `ureq` agent.
pub struct GitHubClient {
    agent: ureq::Agent,
    api_base: String,
    token: Secret,
}

impl GitHubClient {
    pub fn new(api_base: &str, token: Secret, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            api_base: api_base.trim_end_matches('/').to_owned(),
            token,
        }
    }

    /// Endpoint URL under the API base. Each segment is percent-encoded, so
    /// `#`, `?` and `%` in branch names stay part of the path.
    fn endpoint<I>(&self, segments: I) -> Result<Url, HostingError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| HostingError::InvalidUrl(format!("{}: {e}", self.api_base)))?;
        url.path_segments_mut()
            .map_err(|()| HostingError::InvalidUrl(self.api_base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn repo_endpoint(&self, repo: &RepoSlug, resource: &str) -> Result<Url, HostingError> {
        self.endpoint(["repos", repo.owner.as_str(), repo.name.as_str(), resource])
    }

    fn request(&self, method: &str, url: &Url) -> ureq::Request {
        self.agent
            .request_url(method, url)
            .set("Authorization", &format!("Bearer {}", self.token.expose()))
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", API_VERSION)
    }

    /// Open pull request from `head` onto `base` in `repo`, if any.
    pub fn find_open_pull_request(
        &self,
        repo: &RepoSlug,
        head: &BranchName,
        base: &BranchName,
    ) -> Result<Option<PullRequestRef>, HostingError> {
        let url = self.repo_endpoint(repo, "pulls")?;
        let pulls: Vec<PullResponse> = self
            .request("GET", &url)
            .query("head", &format!("{}:{}", repo.owner, head))
            .query("base", base.as_str())
            .query("state", "open")
            .call()
            .map_err(map_ureq_err)?
            .into_json()
            .map_err(|e| HostingError::Decode(e.to_string()))?;
        Ok(pulls.into_iter().next().map(PullRequestRef::from))
    }
}

impl HostingClient for GitHubClient {
    fn branch_exists(&self, repo: &RepoSlug, branch: &BranchName) -> Result<bool, HostingError> {
        // Slashes in a branch name are path separators for this endpoint.
        let segments = ["repos", repo.owner.as_str(), repo.name.as_str(), "branches"]
            .into_iter()
            .chain(branch.as_str().split('/'));
        let url = self.endpoint(segments)?;
        match self.request("GET", &url).call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::Status(404, _)) => Ok(false),
            Err(err) => Err(map_ureq_err(err)),
        }
    }

    fn sync_fork(&self, repo: &RepoSlug, branch: &BranchName) -> Result<(), HostingError> {
        let url = self.repo_endpoint(repo, "merge-upstream")?;
        self.request("POST", &url)
            .send_json(json!({ "branch": branch.as_str() }))
            .map_err(map_ureq_err)?;
        Ok(())
    }

    fn create_pull_request(
        &self,
        repo: &RepoSlug,
        request: &NewPullRequest,
    ) -> Result<PullRequestRef, HostingError> {
        let url = self.repo_endpoint(repo, "pulls")?;
        let result = self.request("POST", &url).send_json(json!({
            "title": request.title,
            "body": request.body,
            "head": request.head.as_str(),
            "base": request.base.as_str(),
            "maintainer_can_modify": true,
        }));

        match result {
            Ok(response) => {
                let created: PullResponse = response
                    .into_json()
                    .map_err(|e| HostingError::Decode(e.to_string()))?;
                Ok(created.into())
            }
            Err(ureq::Error::Status(422, response)) => {
                let message = api_message(&response.into_string().unwrap_or_default());

                // Structured check first: is there an open PR for this pair?
                match self.find_open_pull_request(repo, &request.head, &request.base) {
                    Ok(Some(existing)) => {
                        return Err(HostingError::PullRequestExists {
                            existing: Some(existing),
                        })
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(error = %err, "lookup of existing pull request failed");
                    }
                }
                if message.to_lowercase().contains(ALREADY_EXISTS_MARKER) {
                    return Err(HostingError::PullRequestExists { existing: None });
                }
                Err(HostingError::Status {
                    status: 422,
                    message,
                })
            }
            Err(err) => Err(map_ureq_err(err)),
        }
    }
}

fn map_ureq_err(err: ureq::Error) -> HostingError {
    match err {
        ureq::Error::Status(status, response) => HostingError::Status {
            status,
            message: api_message(&response.into_string().unwrap_or_default()),
        },
        ureq::Error::Transport(transport) => HostingError::Transport(transport.to_string()),
    }
}

/// Flatten a GitHub error body (`message` plus `errors[].message`) to one line.
/// Non-JSON bodies are returned trimmed, as-is.
fn api_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) else {
        return body.trim().to_owned();
    };
    let mut parts = Vec::new();
    if !parsed.message.is_empty() {
        parts.push(parsed.message);
    }
    parts.extend(parsed.errors.into_iter().filter_map(|e| e.message));
    if parts.is_empty() {
        body.trim().to_owned()
    } else {
        parts.join(": ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_message_joins_detail_messages() {
        let body = r#"{"message":"Validation Failed","errors":[{"resource":"PullRequest","code":"custom","message":"A pull request already exists for opencrvs:sync-with-develop."}]}"#;
        assert_eq!(
            api_message(body),
            "Validation Failed: A pull request already exists for opencrvs:sync-with-develop."
        );
    }

    #[test]
    fn api_message_passes_through_plain_text() {
        assert_eq!(api_message("  upstream connect error \n"), "upstream connect error");
    }

    #[test]
    fn api_message_without_fields_returns_body() {
        assert_eq!(api_message("{}"), "{}");
    }
}
