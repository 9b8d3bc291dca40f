//! GitHub client error types

use thiserror::Error;

/// Errors returned by [`GitHubClient`](crate::GitHubClient) implementations
///
/// Nothing in this crate retries on error. Every failure is surfaced to the
/// caller with the name of the operation that was attempted.
#[derive(Error, Debug)]
pub enum GitHubError {
    /// A pull request or its node id could not be resolved
    #[error("not found: {what}")]
    NotFound { what: String },

    /// A branch lookup matched more than one open pull request
    #[error("found {count} open pull requests for branch {branch}")]
    MultipleMatches { branch: String, count: usize },

    /// The HTTP call itself failed (network, auth, rate limit, decoding)
    #[error("{operation} failed: {}", format_octocrab_error(.source))]
    Transport {
        operation: &'static str,
        #[source]
        source: octocrab::Error,
    },

    /// The GraphQL endpoint answered with errors or without data
    #[error("{operation} failed: GraphQL error: {message}")]
    GraphQl {
        operation: &'static str,
        message: String,
    },

    /// A REST call answered with a status other than the expected one
    #[error("{operation} failed: unexpected HTTP status {status}")]
    UnexpectedStatus { operation: &'static str, status: u16 },

    /// No usable credential source, or otherwise unusable client settings
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The app private key could not be read or used for signing
    #[error("invalid credentials: {0}")]
    Credentials(String),
}

pub type Result<T> = std::result::Result<T, GitHubError>;

impl GitHubError {
    /// Build a closure that wraps an octocrab error as a transport failure
    pub(crate) fn transport(operation: &'static str) -> impl FnOnce(octocrab::Error) -> Self {
        move |source| GitHubError::Transport { operation, source }
    }
}

/// Format octocrab::Error to surface the message and status GitHub returned.
fn format_octocrab_error(err: &octocrab::Error) -> String {
    match err {
        octocrab::Error::GitHub { source, .. } => format!(
            "GitHub API error: {} (HTTP {})",
            source.message,
            source.status_code.as_u16()
        ),
        _ => format!("GitHub API error: {err}"),
    }
}
