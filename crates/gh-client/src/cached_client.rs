//! Cached GitHub API client (decorator pattern)
//!
//! Wraps any `GitHubClient` implementation and memoizes branch → PR lookups
//! in an [`ExpireCache`]. Every operation that can change which PR belongs to
//! a branch clears the whole cache when it completes, successful or not, so a
//! stale mapping is never served after a state change.

use crate::client::GitHubClient;
use crate::error::Result;
use crate::types::{CreatePullRequest, MergeMethod, NodeId, PullRequest, RepositoryInfo};
use async_trait::async_trait;
use gh_api_cache::{ClearOnDrop, ExpireCache};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default lifetime of a cached branch lookup
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Cache key of a branch lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FindPrKey {
    pub owner: String,
    pub name: String,
    pub branch: String,
}

impl FindPrKey {
    pub fn new(owner: &str, name: &str, branch: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            branch: branch.to_string(),
        }
    }
}

/// Branch lookup cache. `None` values record that no open PR exists.
pub type FindPrCache = ExpireCache<FindPrKey, Option<u64>>;

/// Cached GitHub API client using the decorator pattern
///
/// Wraps an inner `GitHubClient` and caches `find_pr_for_branch` results,
/// including the "no open PR" answer. Lookup errors are never cached.
///
/// `create_pull_request`, `approve_pull_request`, `merge_pull_request`,
/// `enable_auto_merge` and `add_comment` clear the cache exactly once when
/// they finish, whatever the outcome. All other operations pass through.
///
/// Clones share the same cache.
///
/// # Example
///
/// ```rust,ignore
/// use gh_client::{CachedGitHubClient, OctocrabClient, TokenSource};
/// use std::time::Duration;
///
/// let inner = OctocrabClient::new("https://api.github.com", TokenSource::Static(token));
/// let client = CachedGitHubClient::new(inner, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct CachedGitHubClient<C: GitHubClient + Clone> {
    inner: C,
    find_pr_cache: Arc<FindPrCache>,
}

impl<C: GitHubClient + Clone> CachedGitHubClient<C> {
    /// Create a new cached client with its own cache
    ///
    /// # Arguments
    ///
    /// * `inner` - The inner client to delegate API calls to
    /// * `cache_ttl` - How long a branch lookup stays valid
    pub fn new(inner: C, cache_ttl: Duration) -> Self {
        Self::with_cache(inner, Arc::new(ExpireCache::new(cache_ttl)))
    }

    /// Create a new cached client sharing an existing cache
    pub fn with_cache(inner: C, find_pr_cache: Arc<FindPrCache>) -> Self {
        Self {
            inner,
            find_pr_cache,
        }
    }

    /// Get a reference to the inner client
    ///
    /// Calls made through it bypass the cache and its invalidation.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// The shared branch lookup cache
    pub fn cache(&self) -> &Arc<FindPrCache> {
        &self.find_pr_cache
    }

    /// Guard that clears the branch lookup cache once `operation` completes
    fn invalidate_after(&self, operation: &str) -> ClearOnDrop<'_, FindPrKey, Option<u64>> {
        debug!("Branch lookup cache will be cleared after {}", operation);
        self.find_pr_cache.clear_on_drop()
    }
}

#[async_trait]
impl<C: GitHubClient + Clone> GitHubClient for CachedGitHubClient<C> {
    async fn create_pull_request(&self, request: &CreatePullRequest) -> Result<u64> {
        let _invalidate = self.invalidate_after("create_pull_request");
        self.inner.create_pull_request(request).await
    }

    async fn repository_info(&self, owner: &str, name: &str) -> Result<RepositoryInfo> {
        self.inner.repository_info(owner, name).await
    }

    async fn find_pr_for_branch(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
    ) -> Result<Option<u64>> {
        let key = FindPrKey::new(owner, name, branch);

        if let Some(cached) = self.find_pr_cache.get(&key) {
            debug!(
                "Cache HIT for branch {} in {}/{}: {:?}",
                branch, owner, name, cached
            );
            return Ok(cached);
        }

        // Cache miss - query outside the cache lock
        debug!("Cache MISS for branch {} in {}/{}", branch, owner, name);
        let number = self.inner.find_pr_for_branch(owner, name, branch).await?;

        self.find_pr_cache.set(key, number);
        Ok(number)
    }

    async fn viewer_login(&self) -> Result<String> {
        self.inner.viewer_login().await
    }

    async fn approve_pull_request(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        message: &str,
    ) -> Result<()> {
        let _invalidate = self.invalidate_after("approve_pull_request");
        self.inner
            .approve_pull_request(owner, name, number, message)
            .await
    }

    async fn merge_pull_request(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        method: MergeMethod,
    ) -> Result<()> {
        let _invalidate = self.invalidate_after("merge_pull_request");
        self.inner
            .merge_pull_request(owner, name, number, method)
            .await
    }

    async fn enable_auto_merge(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        method: MergeMethod,
    ) -> Result<()> {
        let _invalidate = self.invalidate_after("enable_auto_merge");
        self.inner
            .enable_auto_merge(owner, name, number, method)
            .await
    }

    async fn fetch_pull_request(
        &self,
        owner: &str,
        name: &str,
        number: u64,
    ) -> Result<PullRequest> {
        self.inner.fetch_pull_request(owner, name, number).await
    }

    async fn add_comment(&self, owner: &str, name: &str, number: u64, body: &str) -> Result<()> {
        let _invalidate = self.invalidate_after("add_comment");
        self.inner.add_comment(owner, name, number, body).await
    }

    async fn find_pull_request_node_id(
        &self,
        owner: &str,
        name: &str,
        number: u64,
    ) -> Result<NodeId> {
        self.inner
            .find_pull_request_node_id(owner, name, number)
            .await
    }

    async fn access_token(&self) -> Result<String> {
        self.inner.access_token().await
    }

    async fn trigger_workflow(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: &str,
        git_ref: &str,
        inputs: &HashMap<String, String>,
    ) -> Result<()> {
        self.inner
            .trigger_workflow(owner, repo, workflow_id, git_ref, inputs)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GitHubError;
    use crate::test_support::GitHubMockServer;
    use crate::types::PullRequestState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted answer of the mock's branch lookup
    #[derive(Debug, Clone, Copy)]
    enum Lookup {
        Found(u64),
        Nothing,
        Ambiguous,
    }

    #[derive(Debug, Clone)]
    struct MockClient {
        lookup: Arc<Mutex<Lookup>>,
        lookup_calls: Arc<AtomicUsize>,
        mutation_calls: Arc<AtomicUsize>,
        fail_mutations: bool,
        hang_merges: bool,
    }

    impl MockClient {
        fn new(lookup: Lookup) -> Self {
            Self {
                lookup: Arc::new(Mutex::new(lookup)),
                lookup_calls: Arc::new(AtomicUsize::new(0)),
                mutation_calls: Arc::new(AtomicUsize::new(0)),
                fail_mutations: false,
                hang_merges: false,
            }
        }

        fn failing(lookup: Lookup) -> Self {
            Self {
                fail_mutations: true,
                ..Self::new(lookup)
            }
        }

        /// Merges that never complete
        fn hanging(lookup: Lookup) -> Self {
            Self {
                hang_merges: true,
                ..Self::new(lookup)
            }
        }

        fn answer(&self, lookup: Lookup) {
            *self.lookup.lock().unwrap() = lookup;
        }

        fn lookup_calls(&self) -> usize {
            self.lookup_calls.load(Ordering::SeqCst)
        }

        fn mutation_calls(&self) -> usize {
            self.mutation_calls.load(Ordering::SeqCst)
        }

        fn mutate(&self, number: u64) -> Result<()> {
            self.mutation_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_mutations {
                return Err(GitHubError::NotFound {
                    what: format!("pull request #{}", number),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl GitHubClient for MockClient {
        async fn create_pull_request(&self, _request: &CreatePullRequest) -> Result<u64> {
            self.mutate(1)?;
            Ok(1)
        }

        async fn repository_info(&self, _owner: &str, _name: &str) -> Result<RepositoryInfo> {
            Ok(RepositoryInfo {
                id: NodeId::from("R_repo"),
                default_branch: None,
            })
        }

        async fn find_pr_for_branch(
            &self,
            _owner: &str,
            _name: &str,
            branch: &str,
        ) -> Result<Option<u64>> {
            self.lookup_calls.fetch_add(1, Ordering::SeqCst);
            match *self.lookup.lock().unwrap() {
                Lookup::Found(number) => Ok(Some(number)),
                Lookup::Nothing => Ok(None),
                Lookup::Ambiguous => Err(GitHubError::MultipleMatches {
                    branch: branch.to_string(),
                    count: 2,
                }),
            }
        }

        async fn viewer_login(&self) -> Result<String> {
            Ok("testuser".to_string())
        }

        async fn approve_pull_request(
            &self,
            _owner: &str,
            _name: &str,
            number: u64,
            _message: &str,
        ) -> Result<()> {
            self.mutate(number)
        }

        async fn merge_pull_request(
            &self,
            _owner: &str,
            _name: &str,
            number: u64,
            _method: MergeMethod,
        ) -> Result<()> {
            if self.hang_merges {
                std::future::pending::<()>().await;
            }
            self.mutate(number)
        }

        async fn enable_auto_merge(
            &self,
            _owner: &str,
            _name: &str,
            number: u64,
            _method: MergeMethod,
        ) -> Result<()> {
            self.mutate(number)
        }

        async fn fetch_pull_request(
            &self,
            _owner: &str,
            _name: &str,
            number: u64,
        ) -> Result<PullRequest> {
            Ok(PullRequest {
                id: NodeId::from("PR_node"),
                number,
                base_ref_name: "main".to_string(),
                base_ref_oid: "aaa111".to_string(),
                head_ref_name: "feature-x".to_string(),
                head_ref_oid: "bbb222".to_string(),
                body: String::new(),
                state: PullRequestState::Open,
            })
        }

        async fn add_comment(
            &self,
            _owner: &str,
            _name: &str,
            number: u64,
            _body: &str,
        ) -> Result<()> {
            self.mutate(number)
        }

        async fn find_pull_request_node_id(
            &self,
            _owner: &str,
            _name: &str,
            _number: u64,
        ) -> Result<NodeId> {
            Ok(NodeId::from("PR_node"))
        }

        async fn access_token(&self) -> Result<String> {
            Ok("test-token".to_string())
        }

        async fn trigger_workflow(
            &self,
            _owner: &str,
            _repo: &str,
            _workflow_id: &str,
            _git_ref: &str,
            _inputs: &HashMap<String, String>,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn cached(mock: &MockClient) -> CachedGitHubClient<MockClient> {
        CachedGitHubClient::new(mock.clone(), Duration::from_secs(3600))
    }

    fn create_request() -> CreatePullRequest {
        CreatePullRequest {
            repository_id: NodeId::from("R_repo"),
            base_ref_name: "main".to_string(),
            head_ref_name: "feature-x".to_string(),
            title: "Add feature x".to_string(),
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn test_lookup_is_cached() {
        let mock = MockClient::new(Lookup::Found(7));
        let client = cached(&mock);

        let first = client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();
        let second = client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();

        assert_eq!(first, Some(7));
        assert_eq!(second, Some(7));
        assert_eq!(mock.lookup_calls(), 1);
    }

    #[tokio::test]
    async fn test_negative_result_is_cached() {
        let mock = MockClient::new(Lookup::Nothing);
        let client = cached(&mock);

        assert_eq!(
            client
                .find_pr_for_branch("owner", "repo", "feature-x")
                .await
                .unwrap(),
            None
        );
        assert_eq!(
            client
                .find_pr_for_branch("owner", "repo", "feature-x")
                .await
                .unwrap(),
            None
        );
        assert_eq!(mock.lookup_calls(), 1);
    }

    #[tokio::test]
    async fn test_ambiguous_lookup_is_not_cached() {
        let mock = MockClient::new(Lookup::Ambiguous);
        let client = cached(&mock);

        let err = client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap_err();
        assert!(matches!(err, GitHubError::MultipleMatches { .. }));
        assert!(client.cache().is_empty());

        // Next lookup goes to the API again
        mock.answer(Lookup::Found(9));
        let found = client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();
        assert_eq!(found, Some(9));
        assert_eq!(mock.lookup_calls(), 2);
    }

    #[tokio::test]
    async fn test_keys_are_distinct_per_owner_repo_and_branch() {
        let mock = MockClient::new(Lookup::Found(7));
        let client = cached(&mock);

        client.find_pr_for_branch("owner", "repo", "a").await.unwrap();
        client.find_pr_for_branch("owner", "repo", "b").await.unwrap();
        client.find_pr_for_branch("owner", "other", "a").await.unwrap();
        client.find_pr_for_branch("other", "repo", "a").await.unwrap();
        client.find_pr_for_branch("owner", "repo", "a").await.unwrap();

        assert_eq!(mock.lookup_calls(), 4);
        assert_eq!(client.cache().len(), 4);
    }

    #[tokio::test]
    async fn test_expired_lookup_is_refetched() {
        let mock = MockClient::new(Lookup::Found(7));
        let client = CachedGitHubClient::new(mock.clone(), Duration::from_millis(1));

        client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();

        assert_eq!(mock.lookup_calls(), 2);
    }

    #[tokio::test]
    async fn test_merge_invalidates_cached_lookup() {
        let mock = MockClient::new(Lookup::Found(7));
        let client = cached(&mock);

        client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();
        client
            .merge_pull_request("owner", "repo", 7, MergeMethod::Squash)
            .await
            .unwrap();

        // PR is merged, so the branch has no open PR anymore
        mock.answer(Lookup::Nothing);
        let found = client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();

        assert_eq!(found, None);
        assert_eq!(mock.lookup_calls(), 2);
    }

    #[tokio::test]
    async fn test_create_invalidates_negative_result() {
        let mock = MockClient::new(Lookup::Nothing);
        let client = cached(&mock);

        client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();
        client.create_pull_request(&create_request()).await.unwrap();

        mock.answer(Lookup::Found(1));
        let found = client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();

        assert_eq!(found, Some(1));
        assert_eq!(mock.lookup_calls(), 2);
    }

    #[tokio::test]
    async fn test_every_mutation_clears_cache() {
        let mock = MockClient::new(Lookup::Found(7));
        let client = cached(&mock);

        let mutations: Vec<&str> = vec!["create", "approve", "merge", "auto-merge", "comment"];
        for mutation in mutations {
            client
                .find_pr_for_branch("owner", "repo", "feature-x")
                .await
                .unwrap();
            assert_eq!(client.cache().len(), 1, "populated before {}", mutation);

            let result = match mutation {
                "create" => client.create_pull_request(&create_request()).await.map(|_| ()),
                "approve" => client.approve_pull_request("owner", "repo", 7, "LGTM").await,
                "merge" => {
                    client
                        .merge_pull_request("owner", "repo", 7, MergeMethod::Merge)
                        .await
                }
                "auto-merge" => {
                    client
                        .enable_auto_merge("owner", "repo", 7, MergeMethod::Squash)
                        .await
                }
                _ => client.add_comment("owner", "repo", 7, "ship it").await,
            };
            result.unwrap();

            assert!(client.cache().is_empty(), "cleared after {}", mutation);
        }

        assert_eq!(mock.mutation_calls(), 5);
        assert_eq!(mock.lookup_calls(), 5);
    }

    #[tokio::test]
    async fn test_failed_mutation_still_invalidates() {
        let mock = MockClient::failing(Lookup::Found(7));
        let client = cached(&mock);

        client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();
        let err = client
            .merge_pull_request("owner", "repo", 7, MergeMethod::Squash)
            .await
            .unwrap_err();

        assert!(matches!(err, GitHubError::NotFound { .. }));
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_mutation_still_invalidates() {
        let mock = MockClient::hanging(Lookup::Found(7));
        let client = cached(&mock);

        client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();
        assert_eq!(client.cache().len(), 1);

        let merge = client.merge_pull_request("owner", "repo", 7, MergeMethod::Squash);
        let outcome = tokio::time::timeout(Duration::from_millis(10), merge).await;

        assert!(outcome.is_err(), "merge should still be pending");
        assert_eq!(mock.mutation_calls(), 0);
        assert!(client.cache().is_empty());

        client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();
        assert_eq!(mock.lookup_calls(), 2);
    }

    #[tokio::test]
    async fn test_read_operations_keep_cache() {
        let mock = MockClient::new(Lookup::Found(7));
        let client = cached(&mock);

        client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();
        client.repository_info("owner", "repo").await.unwrap();
        client.viewer_login().await.unwrap();
        client.fetch_pull_request("owner", "repo", 7).await.unwrap();
        client
            .find_pull_request_node_id("owner", "repo", 7)
            .await
            .unwrap();
        client.access_token().await.unwrap();
        client
            .trigger_workflow("owner", "repo", "ci.yml", "main", &HashMap::new())
            .await
            .unwrap();

        assert_eq!(client.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_cache() {
        let mock = MockClient::new(Lookup::Found(7));
        let client = cached(&mock);
        let clone = client.clone();

        client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();
        clone
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();
        assert_eq!(mock.lookup_calls(), 1);

        clone
            .merge_pull_request("owner", "repo", 7, MergeMethod::Squash)
            .await
            .unwrap();
        assert!(client.cache().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_lookups_and_mutations() {
        let mock = MockClient::new(Lookup::Found(7));
        let client = Arc::new(cached(&mock));
        let mut handles = Vec::new();

        for task in 0..8 {
            let client = Arc::clone(&client);
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    let branch = format!("branch-{}", (task + i) % 4);
                    if i % 7 == 0 {
                        client
                            .merge_pull_request("owner", "repo", 7, MergeMethod::Squash)
                            .await
                            .unwrap();
                    } else {
                        let found = client
                            .find_pr_for_branch("owner", "repo", &branch)
                            .await
                            .unwrap();
                        assert_eq!(found, Some(7));
                    }
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert!(client.cache().len() <= 4);
    }

    #[tokio::test]
    async fn test_merge_forces_live_refetch_against_api() {
        let mock = GitHubMockServer::start().await;
        // Lookup, cache hit, merge, lookup again: two live lookups in total
        mock.find_prs_for_branch(&[7], 2).await;
        mock.pull_request_id("PR_node_7", 1).await;
        mock.mutation_ok("mutation MergePullRequest", "\"PR_node_7\"", 1)
            .await;

        let client = CachedGitHubClient::new(mock.client(), DEFAULT_CACHE_TTL);

        assert_eq!(
            client
                .find_pr_for_branch("owner", "repo", "feature-x")
                .await
                .unwrap(),
            Some(7)
        );
        assert_eq!(
            client
                .find_pr_for_branch("owner", "repo", "feature-x")
                .await
                .unwrap(),
            Some(7)
        );
        client
            .merge_pull_request("owner", "repo", 7, MergeMethod::Squash)
            .await
            .unwrap();
        client
            .find_pr_for_branch("owner", "repo", "feature-x")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_negative_result_served_without_api_call() {
        let mock = GitHubMockServer::start().await;
        mock.find_prs_for_branch(&[], 1).await;

        let client = CachedGitHubClient::new(mock.client(), DEFAULT_CACHE_TTL);
        for _ in 0..3 {
            let found = client
                .find_pr_for_branch("owner", "repo", "feature-x")
                .await
                .unwrap();
            assert_eq!(found, None);
        }
    }

    #[tokio::test]
    async fn test_ambiguous_result_not_cached_against_api() {
        let mock = GitHubMockServer::start().await;
        mock.find_prs_for_branch(&[1, 2], 2).await;

        let client = CachedGitHubClient::new(mock.client(), DEFAULT_CACHE_TTL);
        for _ in 0..2 {
            let err = client
                .find_pr_for_branch("owner", "repo", "feature-x")
                .await
                .unwrap_err();
            assert!(matches!(err, GitHubError::MultipleMatches { .. }));
        }
    }
}
