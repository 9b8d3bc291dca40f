//! Octocrab-based GitHub API client
//!
//! Direct implementation of the `GitHubClient` trait using the octocrab library.
//! This client makes real API calls without any caching.

use crate::client::GitHubClient;
use crate::credentials::{build_octocrab, TokenSource};
use crate::error::{GitHubError, Result};
use crate::graphql::{self, GraphQlResponse};
use crate::types::{CreatePullRequest, MergeMethod, NodeId, PullRequest, RepositoryInfo};
use async_trait::async_trait;
use gh_client_config::ClientConfig;
use log::{debug, info};
use octocrab::Octocrab;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Direct GitHub API client using octocrab
///
/// This is the base implementation that makes actual API calls.
/// It can be wrapped by `CachedGitHubClient` to add caching behavior.
///
/// The octocrab session is rebuilt only when the bearer token changes, which
/// happens when an app installation token is renewed.
#[derive(Debug, Clone)]
pub struct OctocrabClient {
    base_uri: String,
    credentials: Arc<TokenSource>,
    session: Arc<Mutex<Option<Session>>>,
    sessions_built: Arc<AtomicUsize>,
}

#[derive(Debug)]
struct Session {
    token: String,
    octocrab: Octocrab,
}

impl OctocrabClient {
    /// Create a new client against `base_uri` (e.g. `https://api.github.com`)
    pub fn new(base_uri: impl Into<String>, credentials: TokenSource) -> Self {
        Self {
            base_uri: base_uri.into(),
            credentials: Arc::new(credentials),
            session: Arc::new(Mutex::new(None)),
            sessions_built: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a client from an explicit configuration
    ///
    /// Fails with `GitHubError::Configuration` if the configuration carries no
    /// usable credential.
    pub async fn from_config(config: &ClientConfig) -> Result<Self> {
        let credentials = TokenSource::from_config(config).await?;
        info!("GitHub client created for {}", config.base_uri);
        Ok(Self::new(config.base_uri.clone(), credentials))
    }

    /// Base URI all requests are sent to
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Number of octocrab sessions built so far (one per distinct token)
    pub fn sessions_built(&self) -> usize {
        self.sessions_built.load(Ordering::Relaxed)
    }

    /// Octocrab instance authenticated with the current token
    async fn octocrab(&self) -> Result<Octocrab> {
        let token = self.credentials.access_token().await?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = session.as_ref().filter(|s| s.token == token) {
            return Ok(current.octocrab.clone());
        }

        let octocrab = build_octocrab(&self.base_uri, token.clone())?;
        let built = self.sessions_built.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Built octocrab session #{} for {}", built, self.base_uri);
        *session = Some(Session {
            token,
            octocrab: octocrab.clone(),
        });
        Ok(octocrab)
    }

    /// Run a GraphQL document and unwrap the `data` envelope
    async fn graphql<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: &str,
        variables: Value,
    ) -> Result<T> {
        let octocrab = self.octocrab().await?;
        let body = json!({
            "query": query,
            "variables": variables,
        });
        let response: GraphQlResponse<T> = octocrab
            .graphql(&body)
            .await
            .map_err(GitHubError::transport(operation))?;

        if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
            let message = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            if errors.iter().all(|e| e.is_not_found()) {
                return Err(GitHubError::NotFound { what: message });
            }
            return Err(GitHubError::GraphQl { operation, message });
        }

        response.data.ok_or_else(|| GitHubError::GraphQl {
            operation,
            message: "no data in response".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryData<T> {
    repository: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BranchPullRequests {
    pull_requests: Nodes<PullRequestNumber>,
}

#[derive(Debug, Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PullRequestNumber {
    number: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestField<T> {
    pull_request: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PullRequestIdNode {
    id: NodeId,
}

#[derive(Debug, Deserialize)]
struct ViewerData {
    viewer: Viewer,
}

#[derive(Debug, Deserialize)]
struct Viewer {
    login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePullRequestData {
    create_pull_request: CreatedPullRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedPullRequest {
    pull_request: PullRequestNumber,
}

/// Body of `POST /repos/{owner}/{repo}/actions/workflows/{id}/dispatches`
#[derive(Debug, Serialize)]
struct WorkflowDispatch<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: &'a HashMap<String, String>,
}

/// Pick the single open PR for a branch
///
/// No PR is a valid answer; more than one is ambiguous and rejected.
fn select_single_pr(branch: &str, numbers: &[u64]) -> Result<Option<u64>> {
    match numbers {
        [] => Ok(None),
        [number] => Ok(Some(*number)),
        _ => Err(GitHubError::MultipleMatches {
            branch: branch.to_string(),
            count: numbers.len(),
        }),
    }
}

fn repository_not_found(owner: &str, name: &str) -> GitHubError {
    GitHubError::NotFound {
        what: format!("repository {}/{}", owner, name),
    }
}

#[async_trait]
impl GitHubClient for OctocrabClient {
    async fn create_pull_request(&self, request: &CreatePullRequest) -> Result<u64> {
        debug!(
            "Creating pull request {} -> {} ({})",
            request.head_ref_name, request.base_ref_name, request.title
        );

        let data: CreatePullRequestData = self
            .graphql(
                "create_pull_request",
                graphql::CREATE_PULL_REQUEST,
                json!({
                    "input": {
                        "repositoryId": request.repository_id,
                        "baseRefName": request.base_ref_name,
                        "headRefName": request.head_ref_name,
                        "title": request.title,
                        "body": request.body,
                    }
                }),
            )
            .await?;

        let number = data.create_pull_request.pull_request.number;
        debug!("Created pull request #{}", number);
        Ok(number)
    }

    async fn repository_info(&self, owner: &str, name: &str) -> Result<RepositoryInfo> {
        debug!("Fetching repository info for {}/{}", owner, name);

        let data: RepositoryData<RepositoryInfo> = self
            .graphql(
                "repository_info",
                graphql::REPOSITORY_INFO,
                json!({ "owner": owner, "name": name }),
            )
            .await?;

        data.repository
            .ok_or_else(|| repository_not_found(owner, name))
    }

    async fn find_pr_for_branch(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
    ) -> Result<Option<u64>> {
        debug!("Looking up open PR for branch {} in {}/{}", branch, owner, name);

        let data: RepositoryData<BranchPullRequests> = self
            .graphql(
                "find_pr_for_branch",
                graphql::FIND_PULL_REQUESTS_FOR_BRANCH,
                json!({ "owner": owner, "name": name, "branch": branch }),
            )
            .await?;

        let numbers: Vec<u64> = data
            .repository
            .ok_or_else(|| repository_not_found(owner, name))?
            .pull_requests
            .nodes
            .into_iter()
            .map(|node| node.number)
            .collect();

        let selected = select_single_pr(branch, &numbers)?;
        debug!("Branch {} resolved to {:?}", branch, selected);
        Ok(selected)
    }

    async fn viewer_login(&self) -> Result<String> {
        debug!("Fetching authenticated user");

        let data: ViewerData = self
            .graphql("viewer_login", graphql::VIEWER, json!({}))
            .await?;
        Ok(data.viewer.login)
    }

    async fn approve_pull_request(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        message: &str,
    ) -> Result<()> {
        let id = self.find_pull_request_node_id(owner, name, number).await?;
        debug!("Approving PR #{} in {}/{} ({})", number, owner, name, id);

        let _: IgnoredAny = self
            .graphql(
                "approve_pull_request",
                graphql::APPROVE_PULL_REQUEST,
                json!({
                    "input": {
                        "pullRequestId": id,
                        "body": message,
                        "event": "APPROVE",
                    }
                }),
            )
            .await?;
        Ok(())
    }

    async fn merge_pull_request(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        method: MergeMethod,
    ) -> Result<()> {
        let id = self.find_pull_request_node_id(owner, name, number).await?;
        debug!(
            "Merging PR #{} in {}/{} ({}) with {:?}",
            number, owner, name, id, method
        );

        let _: IgnoredAny = self
            .graphql(
                "merge_pull_request",
                graphql::MERGE_PULL_REQUEST,
                json!({
                    "input": {
                        "pullRequestId": id,
                        "mergeMethod": method.as_graphql(),
                    }
                }),
            )
            .await?;
        Ok(())
    }

    async fn enable_auto_merge(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        method: MergeMethod,
    ) -> Result<()> {
        let id = self.find_pull_request_node_id(owner, name, number).await?;
        debug!(
            "Enabling auto-merge for PR #{} in {}/{} ({})",
            number, owner, name, id
        );

        let _: IgnoredAny = self
            .graphql(
                "enable_auto_merge",
                graphql::ENABLE_AUTO_MERGE,
                json!({
                    "input": {
                        "pullRequestId": id,
                        "mergeMethod": method.as_graphql(),
                    }
                }),
            )
            .await?;
        Ok(())
    }

    async fn fetch_pull_request(
        &self,
        owner: &str,
        name: &str,
        number: u64,
    ) -> Result<PullRequest> {
        debug!("Fetching PR #{} in {}/{}", number, owner, name);

        let data: RepositoryData<PullRequestField<PullRequest>> = self
            .graphql(
                "fetch_pull_request",
                graphql::PULL_REQUEST,
                json!({ "owner": owner, "name": name, "number": number }),
            )
            .await?;

        data.repository
            .ok_or_else(|| repository_not_found(owner, name))?
            .pull_request
            .ok_or_else(|| GitHubError::NotFound {
                what: format!("pull request #{} in {}/{}", number, owner, name),
            })
    }

    async fn add_comment(&self, owner: &str, name: &str, number: u64, body: &str) -> Result<()> {
        let id = self.find_pull_request_node_id(owner, name, number).await?;
        debug!("Commenting on PR #{} in {}/{} ({})", number, owner, name, id);

        let _: IgnoredAny = self
            .graphql(
                "add_comment",
                graphql::ADD_COMMENT,
                json!({
                    "input": {
                        "subjectId": id,
                        "body": body,
                    }
                }),
            )
            .await?;
        Ok(())
    }

    async fn find_pull_request_node_id(
        &self,
        owner: &str,
        name: &str,
        number: u64,
    ) -> Result<NodeId> {
        debug!("Resolving node id of PR #{} in {}/{}", number, owner, name);

        let data: RepositoryData<PullRequestField<PullRequestIdNode>> = self
            .graphql(
                "find_pull_request_node_id",
                graphql::PULL_REQUEST_ID,
                json!({ "owner": owner, "name": name, "number": number }),
            )
            .await?;

        data.repository
            .and_then(|repo| repo.pull_request)
            .map(|pr| pr.id)
            .ok_or_else(|| GitHubError::NotFound {
                what: format!("pull request #{} in {}/{}", number, owner, name),
            })
    }

    async fn access_token(&self) -> Result<String> {
        self.credentials.access_token().await
    }

    async fn trigger_workflow(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: &str,
        git_ref: &str,
        inputs: &HashMap<String, String>,
    ) -> Result<()> {
        debug!(
            "Triggering workflow {} on {} in {}/{} with {} inputs",
            workflow_id,
            git_ref,
            owner,
            repo,
            inputs.len()
        );

        let octocrab = self.octocrab().await?;
        let route = format!(
            "/repos/{}/{}/actions/workflows/{}/dispatches",
            owner, repo, workflow_id
        );
        let body = WorkflowDispatch { git_ref, inputs };
        let response = octocrab
            ._post(route, Some(&body))
            .await
            .map_err(GitHubError::transport("trigger_workflow"))?;

        let status = response.status().as_u16();
        if status != 204 {
            return Err(GitHubError::UnexpectedStatus {
                operation: "trigger_workflow",
                status,
            });
        }

        debug!("Workflow {} dispatched", workflow_id);
        Ok(())
    }
}
