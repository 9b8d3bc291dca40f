//! GitHub client trait
//!
//! This module defines the core `GitHubClient` trait that all client
//! implementations must satisfy.

use crate::error::Result;
use crate::types::{CreatePullRequest, MergeMethod, NodeId, PullRequest, RepositoryInfo};
use async_trait::async_trait;
use std::collections::HashMap;

/// GitHub API client trait
///
/// Defines the pull-request automation surface of the GitHub API.
/// Implementations can be direct (hitting the API) or decorated
/// with caching.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow sharing across
/// async tasks and threads.
///
/// # Example
///
/// ```rust,ignore
/// use gh_client::GitHubClient;
///
/// async fn land(client: &dyn GitHubClient, branch: &str) -> gh_client::Result<()> {
///     if let Some(number) = client.find_pr_for_branch("owner", "repo", branch).await? {
///         client.merge_pull_request("owner", "repo", number, Default::default()).await?;
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait GitHubClient: Send + Sync {
    /// Create a pull request from an existing remote branch
    ///
    /// # Returns
    ///
    /// The number of the new pull request.
    async fn create_pull_request(&self, request: &CreatePullRequest) -> Result<u64>;

    /// Fetch the repository node id and default branch
    async fn repository_info(&self, owner: &str, name: &str) -> Result<RepositoryInfo>;

    /// Find the open pull request whose head branch is `branch`
    ///
    /// # Returns
    ///
    /// `Ok(None)` if no open PR exists for the branch, or
    /// `GitHubError::MultipleMatches` if more than one does.
    async fn find_pr_for_branch(&self, owner: &str, name: &str, branch: &str)
        -> Result<Option<u64>>;

    /// Login of the authenticated user (or app bot)
    async fn viewer_login(&self) -> Result<String>;

    /// Approve a pull request with the given review message
    async fn approve_pull_request(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        message: &str,
    ) -> Result<()>;

    /// Merge a pull request and close it
    ///
    /// GitHub refuses the merge if branch protection is not satisfied.
    async fn merge_pull_request(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        method: MergeMethod,
    ) -> Result<()>;

    /// Enable auto-merge so GitHub merges once all requirements pass
    async fn enable_auto_merge(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        method: MergeMethod,
    ) -> Result<()>;

    /// Fetch a single pull request by number
    async fn fetch_pull_request(&self, owner: &str, name: &str, number: u64)
        -> Result<PullRequest>;

    /// Add a comment to a pull request
    async fn add_comment(&self, owner: &str, name: &str, number: u64, body: &str) -> Result<()>;

    /// Resolve the GraphQL node id of a pull request
    async fn find_pull_request_node_id(
        &self,
        owner: &str,
        name: &str,
        number: u64,
    ) -> Result<NodeId>;

    /// Bearer token currently used for API calls
    async fn access_token(&self) -> Result<String>;

    /// Trigger a `workflow_dispatch` run
    ///
    /// # Arguments
    ///
    /// * `workflow_id` - Workflow file name (e.g. "deploy.yml") or numeric id
    /// * `git_ref` - Branch or tag the workflow runs on
    /// * `inputs` - Workflow inputs
    async fn trigger_workflow(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: &str,
        git_ref: &str,
        inputs: &HashMap<String, String>,
    ) -> Result<()>;
}
