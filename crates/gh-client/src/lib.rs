//! GitHub pull-request automation client with lookup caching
//!
//! This crate provides a trait-based GitHub API client for pull-request
//! workflows: create, find-by-branch, approve, merge, auto-merge, comment and
//! workflow dispatch. The design follows the decorator pattern, allowing
//! caching behavior to be composed with the base client.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              GitHubClient trait                  │
//! │  - find_pr_for_branch()                          │
//! │  - create / approve / merge / auto-merge         │
//! │  - add_comment() / trigger_workflow()            │
//! └─────────────────────────────────────────────────┘
//!                        │
//!        ┌───────────────┴───────────────┐
//!        ▼                               ▼
//! ┌─────────────────┐         ┌─────────────────────┐
//! │ OctocrabClient  │         │ CachedGitHubClient  │
//! │ (direct API)    │◄────────│ (decorator)         │
//! └─────────────────┘         └─────────────────────┘
//! ```
//!
//! `CachedGitHubClient` memoizes branch lookups in an expiring cache and
//! clears it after every operation that can change a branch's PR.
//!
//! # Example
//!
//! ```rust,no_run
//! use gh_client::{CachedGitHubClient, GitHubClient, MergeMethod, OctocrabClient};
//! use gh_client_config::ClientConfig;
//!
//! # async fn example() -> gh_client::Result<()> {
//! let config = ClientConfig::discover().await;
//! let client = CachedGitHubClient::new(
//!     OctocrabClient::from_config(&config).await?,
//!     config.cache_ttl(),
//! );
//!
//! if let Some(number) = client.find_pr_for_branch("owner", "repo", "feature-x").await? {
//!     client.merge_pull_request("owner", "repo", number, MergeMethod::Squash).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod cached_client;
pub mod client;
pub mod credentials;
pub mod error;
mod graphql;
pub mod octocrab_client;
pub mod types;

#[cfg(test)]
mod test_support;

pub use cached_client::{CachedGitHubClient, FindPrCache, FindPrKey, DEFAULT_CACHE_TTL};
pub use client::GitHubClient;
pub use credentials::{AppInstallation, TokenSource};
pub use error::{GitHubError, Result};
pub use octocrab_client::OctocrabClient;
pub use types::{
    BranchRef, CreatePullRequest, MergeMethod, NodeId, PullRequest, PullRequestState,
    RepositoryInfo,
};

// Re-export cache types for convenience
pub use gh_api_cache::{ClearOnDrop, ExpireCache};

// Re-export octocrab so consumers don't need to depend on it directly
pub use octocrab;
