//! wiremock-based GitHub mock server for testing.
//!
//! GraphQL requests all hit `POST /graphql`; mocks tell them apart by the
//! operation name at the start of each document (e.g. `query PullRequestId`).
//! Mocks mounted with an expected call count are verified when the server is
//! dropped.

use crate::credentials::{AppInstallation, TokenSource};
use crate::OctocrabClient;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Throwaway 2048-bit RSA key for GitHub App tests
pub(crate) const APP_KEY_PEM: &str = include_str!("../testdata/app-key.pem");

pub(crate) struct GitHubMockServer {
    server: MockServer,
}

impl GitHubMockServer {
    /// Start a new mock server.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Get an OctocrabClient configured to use this mock server.
    pub fn client(&self) -> OctocrabClient {
        OctocrabClient::new(
            self.server.uri(),
            TokenSource::Static("test-token".to_string()),
        )
    }

    /// Base URI of the mock server.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Get an OctocrabClient authenticating as app installation `installation_id`.
    pub fn app_client(&self, installation_id: u64) -> OctocrabClient {
        let app = AppInstallation::new(1, installation_id, APP_KEY_PEM, self.server.uri())
            .expect("fixture key should parse");
        OctocrabClient::new(self.server.uri(), TokenSource::AppInstallation(app))
    }

    /// Mock one installation token exchange answering with `token`.
    ///
    /// The request must carry a JWT bearer credential. Each call mounts a
    /// mock that matches exactly once, so repeated calls queue tokens in order.
    pub async fn installation_token(&self, installation_id: u64, token: &str) {
        Mock::given(method("POST"))
            .and(path(format!(
                "/app/installations/{}/access_tokens",
                installation_id
            )))
            .and(header_regex("authorization", "^Bearer ey"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "token": token,
                "expires_at": "2030-01-01T00:00:00Z"
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&self.server)
            .await;
    }

    async fn graphql(&self, operation: &str, response: Value, expected_calls: Option<u64>) {
        let mock = Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_string_contains(operation))
            .respond_with(ResponseTemplate::new(200).set_body_json(response));
        let mock = match expected_calls {
            Some(calls) => mock.expect(calls),
            None => mock,
        };
        mock.mount(&self.server).await;
    }

    /// Mock the open-PR lookup for a branch, answering with `numbers`.
    pub async fn find_prs_for_branch(&self, numbers: &[u64], expected_calls: u64) {
        let nodes: Vec<Value> = numbers.iter().map(|n| json!({ "number": n })).collect();
        self.graphql(
            "query FindPullRequestsForBranch",
            json!({
                "data": {
                    "repository": {
                        "pullRequests": { "nodes": nodes }
                    }
                }
            }),
            Some(expected_calls),
        )
        .await;
    }

    /// Mock node id resolution for any PR number.
    pub async fn pull_request_id(&self, node_id: &str, expected_calls: u64) {
        self.graphql(
            "query PullRequestId",
            json!({
                "data": {
                    "repository": {
                        "pullRequest": { "id": node_id }
                    }
                }
            }),
            Some(expected_calls),
        )
        .await;
    }

    /// Mock node id resolution failing with GitHub's NOT_FOUND error.
    pub async fn pull_request_id_not_found(&self) {
        self.graphql(
            "query PullRequestId",
            json!({
                "data": { "repository": { "pullRequest": null } },
                "errors": [{
                    "type": "NOT_FOUND",
                    "path": ["repository", "pullRequest"],
                    "message": "Could not resolve to a PullRequest with the number of 999."
                }]
            }),
            None,
        )
        .await;
    }

    /// Mock a full pull request query.
    pub async fn pull_request(&self, number: u64, head_branch: &str) {
        self.graphql(
            "query PullRequest(",
            json!({
                "data": {
                    "repository": {
                        "pullRequest": {
                            "id": format!("PR_node_{}", number),
                            "number": number,
                            "baseRefName": "main",
                            "baseRefOid": "aaa111",
                            "headRefName": head_branch,
                            "headRefOid": "bbb222",
                            "body": "Test body",
                            "state": "OPEN"
                        }
                    }
                }
            }),
            None,
        )
        .await;
    }

    /// Mock the repository info query.
    pub async fn repository_info(&self, id: &str, default_branch: &str) {
        self.graphql(
            "query RepositoryInfo",
            json!({
                "data": {
                    "repository": {
                        "id": id,
                        "defaultBranchRef": { "name": default_branch, "id": "REF_default" }
                    }
                }
            }),
            None,
        )
        .await;
    }

    /// Mock the viewer query.
    pub async fn viewer(&self, login: &str) {
        self.graphql(
            "query Viewer",
            json!({ "data": { "viewer": { "login": login, "id": "U_test" } } }),
            None,
        )
        .await;
    }

    /// Mock the create-PR mutation.
    pub async fn create_pull_request(&self, number: u64) {
        self.graphql(
            "mutation CreatePullRequest",
            json!({
                "data": {
                    "createPullRequest": { "pullRequest": { "number": number } }
                }
            }),
            Some(1),
        )
        .await;
    }

    /// Mock a mutation that succeeds when its request body contains `body_fragment`.
    pub async fn mutation_ok(&self, operation: &str, body_fragment: &str, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_string_contains(operation))
            .and(body_string_contains(body_fragment))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": { "ok": { "clientMutationId": null } } })),
            )
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    /// Mock a GraphQL document failing with a plain error message.
    pub async fn graphql_error(&self, operation: &str, message: &str) {
        self.graphql(
            operation,
            json!({
                "data": null,
                "errors": [{ "message": message }]
            }),
            None,
        )
        .await;
    }

    /// Mock the workflow dispatch endpoint answering with `status`.
    pub async fn workflow_dispatch(&self, workflow_id: &str, status: u16) {
        Mock::given(method("POST"))
            .and(path(format!(
                "/repos/owner/repo/actions/workflows/{}/dispatches",
                workflow_id
            )))
            .and(body_string_contains("\"ref\":\"main\""))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&self.server)
            .await;
    }
}
