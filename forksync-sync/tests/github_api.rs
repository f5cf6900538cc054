//! GitHubClient against a local mock of the REST API.

use std::time::Duration;

use mockito::Matcher;

use forksync_core::{BranchName, RepoSlug, Secret};
use forksync_sync::{GitHubClient, HostingClient, HostingError, NewPullRequest};

fn client(server: &mockito::Server) -> GitHubClient {
    GitHubClient::new(&server.url(), Secret::new("ghp_test"), Duration::from_secs(5))
}

fn fork() -> RepoSlug {
    RepoSlug::new("opencrvs", "opencrvs-farajaland")
}

fn request() -> NewPullRequest {
    NewPullRequest {
        head: BranchName::from("sync-with-develop"),
        base: BranchName::from("develop"),
        title: "Update Farajaland from develop".into(),
        body: "body".into(),
    }
}

#[test]
fn branch_exists_true_on_200() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/repos/opencrvs/opencrvs-farajaland/branches/develop")
        .match_header("authorization", "Bearer ghp_test")
        .match_header("x-github-api-version", "2022-11-28")
        .with_status(200)
        .with_body(r#"{"name":"develop"}"#)
        .create();

    let exists = client(&server)
        .branch_exists(&fork(), &BranchName::from("develop"))
        .expect("branch check");
    assert!(exists);
    mock.assert();
}

#[test]
fn branch_exists_false_on_404() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/repos/opencrvs/opencrvs-farajaland/branches/release-v9")
        .with_status(404)
        .with_body(r#"{"message":"Branch not found"}"#)
        .create();

    let exists = client(&server)
        .branch_exists(&fork(), &BranchName::from("release-v9"))
        .expect("branch check");
    assert!(!exists);
}

#[test]
fn branch_name_with_reserved_characters_is_percent_encoded() {
    let mut server = mockito::Server::new();
    let encoded = server
        .mock("GET", "/repos/opencrvs/opencrvs-farajaland/branches/fix%231")
        .with_status(200)
        .with_body(r#"{"name":"fix#1"}"#)
        .create();
    let truncated = server
        .mock("GET", "/repos/opencrvs/opencrvs-farajaland/branches/fix")
        .with_status(200)
        .with_body(r#"{"name":"fix"}"#)
        .expect(0)
        .create();

    let exists = client(&server)
        .branch_exists(&fork(), &BranchName::from("fix#1"))
        .expect("branch check");
    assert!(exists);
    encoded.assert();
    truncated.assert();
}

#[test]
fn branch_name_slashes_stay_path_separators() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/repos/opencrvs/opencrvs-farajaland/branches/release/v1.9")
        .with_status(200)
        .with_body(r#"{"name":"release/v1.9"}"#)
        .create();

    let exists = client(&server)
        .branch_exists(&fork(), &BranchName::from("release/v1.9"))
        .expect("branch check");
    assert!(exists);
    mock.assert();
}

#[test]
fn malformed_api_base_is_an_error() {
    let client = GitHubClient::new("not a url", Secret::new("ghp_test"), Duration::from_secs(5));
    let err = client
        .branch_exists(&fork(), &BranchName::from("develop"))
        .expect_err("bad base");
    assert!(matches!(err, HostingError::InvalidUrl(_)));
}

#[test]
fn branch_exists_surfaces_server_errors() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/repos/opencrvs/opencrvs-farajaland/branches/develop")
        .with_status(502)
        .with_body("Bad Gateway")
        .create();

    let err = client(&server)
        .branch_exists(&fork(), &BranchName::from("develop"))
        .expect_err("502");
    assert!(matches!(err, HostingError::Status { status: 502, .. }));
}

#[test]
fn sync_fork_posts_branch() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/repos/opencrvs/opencrvs-farajaland/merge-upstream")
        .match_body(Matcher::Json(serde_json::json!({ "branch": "develop" })))
        .with_status(200)
        .with_body(r#"{"message":"Successfully fetched and fast-forwarded from upstream opencrvs:develop.","merge_type":"fast-forward","base_branch":"opencrvs:develop"}"#)
        .create();

    client(&server)
        .sync_fork(&fork(), &BranchName::from("develop"))
        .expect("sync");
    mock.assert();
}

#[test]
fn sync_fork_conflict_is_an_error_with_message() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/repos/opencrvs/opencrvs-farajaland/merge-upstream")
        .with_status(409)
        .with_body(r#"{"message":"There are merge conflicts"}"#)
        .create();

    let err = client(&server)
        .sync_fork(&fork(), &BranchName::from("develop"))
        .expect_err("409");
    assert_eq!(err.to_string(), "GitHub API returned 409: There are merge conflicts");
}

#[test]
fn create_pull_request_returns_number_and_url() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/repos/opencrvs/opencrvs-farajaland/pulls")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "head": "sync-with-develop",
            "base": "develop",
            "title": "Update Farajaland from develop",
        })))
        .with_status(201)
        .with_body(r#"{"number":101,"html_url":"https://github.com/opencrvs/opencrvs-farajaland/pull/101"}"#)
        .create();

    let pr = client(&server)
        .create_pull_request(&fork(), &request())
        .expect("create");
    assert_eq!(pr.number, Some(101));
    assert_eq!(pr.url, "https://github.com/opencrvs/opencrvs-farajaland/pull/101");
    mock.assert();
}

#[test]
fn duplicate_pull_request_is_resolved_by_lookup() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/repos/opencrvs/opencrvs-farajaland/pulls")
        .with_status(422)
        .with_body(r#"{"message":"Validation Failed","errors":[{"message":"A pull request already exists for opencrvs:sync-with-develop."}]}"#)
        .create();
    let lookup = server
        .mock("GET", "/repos/opencrvs/opencrvs-farajaland/pulls")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("head".into(), "opencrvs:sync-with-develop".into()),
            Matcher::UrlEncoded("base".into(), "develop".into()),
            Matcher::UrlEncoded("state".into(), "open".into()),
        ]))
        .with_status(200)
        .with_body(r#"[{"number":97,"html_url":"https://github.com/opencrvs/opencrvs-farajaland/pull/97"}]"#)
        .create();

    let err = client(&server)
        .create_pull_request(&fork(), &request())
        .expect_err("duplicate");
    match err {
        HostingError::PullRequestExists { existing: Some(pr) } => assert_eq!(pr.number, Some(97)),
        other => panic!("unexpected error: {other:?}"),
    }
    lookup.assert();
}

#[test]
fn duplicate_message_is_recognized_when_lookup_is_empty() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/repos/opencrvs/opencrvs-farajaland/pulls")
        .with_status(422)
        .with_body(r#"{"message":"Validation Failed","errors":[{"message":"A pull request already exists for opencrvs:sync-with-develop."}]}"#)
        .create();
    server
        .mock("GET", "/repos/opencrvs/opencrvs-farajaland/pulls")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create();

    let err = client(&server)
        .create_pull_request(&fork(), &request())
        .expect_err("duplicate");
    assert!(matches!(err, HostingError::PullRequestExists { existing: None }));
}

#[test]
fn other_validation_errors_keep_raw_text() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/repos/opencrvs/opencrvs-farajaland/pulls")
        .with_status(422)
        .with_body(r#"{"message":"Validation Failed","errors":[{"message":"No commits between develop and sync-with-develop"}]}"#)
        .create();
    server
        .mock("GET", "/repos/opencrvs/opencrvs-farajaland/pulls")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create();

    let err = client(&server)
        .create_pull_request(&fork(), &request())
        .expect_err("422");
    assert_eq!(
        err.to_string(),
        "GitHub API returned 422: Validation Failed: No commits between develop and sync-with-develop"
    );
}
