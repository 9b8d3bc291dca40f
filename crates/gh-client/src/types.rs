//! GitHub API data transfer objects
//!
//! These types mirror the GraphQL shapes this crate reads and writes. They are
//! intentionally separate from application domain models to keep this crate
//! pure and reusable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque GraphQL node identifier (e.g. `PR_kwDOA...`)
///
/// Addresses an entity independently of its human-facing number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Repository identity and default branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    /// Repository node id, required to create pull requests
    pub id: NodeId,

    /// Default branch (None for an empty repository)
    #[serde(rename = "defaultBranchRef")]
    pub default_branch: Option<BranchRef>,
}

/// A git ref as reported by GraphQL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    /// Branch name (e.g. "main")
    pub name: String,
    /// Ref node id
    pub id: NodeId,
}

/// A pull request from the GraphQL API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// Node id used by mutations
    pub id: NodeId,

    /// PR number (e.g., 123)
    pub number: u64,

    /// Base branch name, even if the ref has been deleted
    pub base_ref_name: String,

    /// Base commit SHA
    pub base_ref_oid: String,

    /// HEAD branch name, even if the ref has been deleted
    pub head_ref_name: String,

    /// HEAD commit SHA
    pub head_ref_oid: String,

    /// Body as Markdown
    pub body: String,

    /// Open, closed or merged
    pub state: PullRequestState,
}

/// Pull request lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

/// Input for creating a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePullRequest {
    /// Node id of the target repository (see `repository_info`)
    pub repository_id: NodeId,
    /// Branch the changes are merged into
    pub base_ref_name: String,
    /// Branch that holds the changes; must already exist on the remote
    pub head_ref_name: String,
    pub title: String,
    pub body: String,
}

/// Merge method for pull requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethod {
    /// Create a merge commit
    Merge,
    /// Squash all commits into one
    #[default]
    Squash,
    /// Rebase commits onto the base branch
    Rebase,
}

impl MergeMethod {
    /// GraphQL `PullRequestMergeMethod` enum value
    pub fn as_graphql(&self) -> &'static str {
        match self {
            MergeMethod::Merge => "MERGE",
            MergeMethod::Squash => "SQUASH",
            MergeMethod::Rebase => "REBASE",
        }
    }
}
