//! GraphQL documents and response envelope
//!
//! Every document carries an operation name so requests are easy to tell
//! apart in debug logs and mock servers.

use serde::Deserialize;

pub(crate) const FIND_PULL_REQUESTS_FOR_BRANCH: &str = r#"
query FindPullRequestsForBranch($owner: String!, $name: String!, $branch: String!) {
  repository(owner: $owner, name: $name) {
    pullRequests(states: [OPEN], first: 10, headRefName: $branch) {
      nodes { number }
    }
  }
}"#;

pub(crate) const PULL_REQUEST_ID: &str = r#"
query PullRequestId($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) { id }
  }
}"#;

pub(crate) const PULL_REQUEST: &str = r#"
query PullRequest($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      id
      number
      baseRefName
      baseRefOid
      headRefName
      headRefOid
      body
      state
    }
  }
}"#;

pub(crate) const REPOSITORY_INFO: &str = r#"
query RepositoryInfo($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    id
    defaultBranchRef { name id }
  }
}"#;

pub(crate) const VIEWER: &str = r#"
query Viewer {
  viewer { login id }
}"#;

pub(crate) const CREATE_PULL_REQUEST: &str = r#"
mutation CreatePullRequest($input: CreatePullRequestInput!) {
  createPullRequest(input: $input) {
    pullRequest { number }
  }
}"#;

pub(crate) const APPROVE_PULL_REQUEST: &str = r#"
mutation ApprovePullRequest($input: AddPullRequestReviewInput!) {
  addPullRequestReview(input: $input) {
    pullRequestReview { id }
  }
}"#;

pub(crate) const MERGE_PULL_REQUEST: &str = r#"
mutation MergePullRequest($input: MergePullRequestInput!) {
  mergePullRequest(input: $input) {
    pullRequest { id }
  }
}"#;

pub(crate) const ENABLE_AUTO_MERGE: &str = r#"
mutation EnableAutoMerge($input: EnablePullRequestAutoMergeInput!) {
  enablePullRequestAutoMerge(input: $input) {
    pullRequest { id }
  }
}"#;

pub(crate) const ADD_COMMENT: &str = r#"
mutation AddComment($input: AddCommentInput!) {
  addComment(input: $input) {
    clientMutationId
  }
}"#;

/// GitHub GraphQL response envelope
#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
}

/// A single entry of the `errors` array
#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl GraphQlError {
    pub fn is_not_found(&self) -> bool {
        self.kind.as_deref() == Some("NOT_FOUND")
    }
}
