//! Credential sources for the GitHub API
//!
//! Two kinds of credential end up here:
//! - a static token (`GITHUB_TOKEN` or the token cached by the `gh` CLI)
//! - a GitHub App installation, authenticated with a PEM private key
//!
//! Discovery of *which* source to use happens in `gh-client-config`; this
//! module only turns an explicit [`ClientConfig`] into a [`TokenSource`].

use crate::error::{GitHubError, Result};
use chrono::Utc;
use gh_api_cache::ExpireCache;
use gh_client_config::ClientConfig;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, info};
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How long an installation token is reused (GitHub issues them for one hour)
const INSTALLATION_TOKEN_TTL: Duration = Duration::from_secs(50 * 60);

/// Backdate JWTs to tolerate clock drift between us and GitHub
const JWT_CLOCK_DRIFT_SECS: i64 = 60;

/// GitHub rejects app JWTs that live longer than ten minutes
const JWT_LIFETIME_SECS: i64 = 9 * 60;

/// Where bearer tokens come from
pub enum TokenSource {
    /// A personal access token or a token cached by the `gh` CLI
    Static(String),
    /// A GitHub App installation
    AppInstallation(AppInstallation),
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Static(_) => f.write_str("TokenSource::Static(..)"),
            TokenSource::AppInstallation(app) => {
                f.debug_tuple("TokenSource::AppInstallation").field(app).finish()
            }
        }
    }
}

impl TokenSource {
    /// Select a credential source from an explicit configuration
    ///
    /// An explicit token wins over app credentials. App credentials are
    /// validated by exchanging them for an installation token once.
    pub async fn from_config(config: &ClientConfig) -> Result<Self> {
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            info!("Authenticating with a static token");
            return Ok(TokenSource::Static(token.to_string()));
        }

        if config.has_app_key() {
            let app = AppInstallation::from_config(config)?;
            // Fail at construction rather than on the first API call
            app.access_token().await?;
            info!(
                "Authenticating as GitHub App {} (installation {})",
                app.app_id, app.installation_id
            );
            return Ok(TokenSource::AppInstallation(app));
        }

        Err(GitHubError::Configuration(
            "no token provided: set GITHUB_TOKEN, authenticate with the `gh` CLI, \
             or configure a GitHub App PEM key"
                .to_string(),
        ))
    }

    /// Current bearer token
    pub async fn access_token(&self) -> Result<String> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::AppInstallation(app) => app.access_token().await,
        }
    }

    /// Forget a minted installation token; static tokens are unaffected
    pub fn invalidate(&self) {
        if let TokenSource::AppInstallation(app) = self {
            app.invalidate_token();
        }
    }
}

/// GitHub App installation credentials
///
/// Installation tokens are minted on demand by signing a short-lived JWT with
/// the app's private key, and reused until shortly before they expire.
pub struct AppInstallation {
    app_id: u64,
    installation_id: u64,
    key: EncodingKey,
    base_uri: String,
    token_cache: ExpireCache<(), String>,
}

impl fmt::Debug for AppInstallation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppInstallation")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .field("base_uri", &self.base_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Debug, Deserialize)]
struct InstallationTokenResponse {
    token: String,
}

impl AppInstallation {
    /// Create installation credentials from an RSA private key in PEM format
    pub fn new(
        app_id: u64,
        installation_id: u64,
        pem_key: &str,
        base_uri: impl Into<String>,
    ) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(pem_key.as_bytes())
            .map_err(|e| GitHubError::Credentials(format!("unable to parse PEM key: {e}")))?;

        Ok(Self {
            app_id,
            installation_id,
            key,
            base_uri: base_uri.into(),
            token_cache: ExpireCache::new(INSTALLATION_TOKEN_TTL),
        })
    }

    fn from_config(config: &ClientConfig) -> Result<Self> {
        let (Some(app_id), Some(installation_id)) = (config.app_id, config.installation_id) else {
            return Err(GitHubError::Configuration(
                "a PEM key requires both GITHUB_APP_ID and GITHUB_INSTALLATION_ID".to_string(),
            ));
        };

        let pem = match (&config.pem_key, &config.pem_key_path) {
            (Some(pem), _) if !pem.is_empty() => pem.clone(),
            (_, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                GitHubError::Credentials(format!(
                    "unable to read key file {}: {e}",
                    path.display()
                ))
            })?,
            _ => {
                return Err(GitHubError::Configuration(
                    "no PEM key configured".to_string(),
                ))
            }
        };

        Self::new(app_id, installation_id, &pem, config.base_uri.clone())
    }

    /// Installation token, minted on first use and reused until near expiry
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.token_cache.get(&()) {
            return Ok(token);
        }

        debug!(
            "Requesting installation token for app {} installation {}",
            self.app_id, self.installation_id
        );
        let jwt = self.sign_jwt()?;
        let app_client = build_octocrab(&self.base_uri, jwt)?;
        let route = format!("/app/installations/{}/access_tokens", self.installation_id);
        let response: InstallationTokenResponse = app_client
            .post(route, None::<&()>)
            .await
            .map_err(GitHubError::transport("create_installation_token"))?;

        self.token_cache.set((), response.token.clone());
        Ok(response.token)
    }

    /// Drop the cached installation token so the next call mints a new one
    pub fn invalidate_token(&self) {
        debug!(
            "Dropping installation token for app {} installation {}",
            self.app_id, self.installation_id
        );
        self.token_cache.clear();
    }

    fn sign_jwt(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = AppClaims {
            iat: now - JWT_CLOCK_DRIFT_SECS,
            exp: now + JWT_LIFETIME_SECS,
            iss: self.app_id.to_string(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| GitHubError::Credentials(format!("unable to sign app JWT: {e}")))
    }
}

/// Build an octocrab instance that sends `token` as bearer credential
pub(crate) fn build_octocrab(base_uri: &str, token: String) -> Result<Octocrab> {
    Octocrab::builder()
        .base_uri(base_uri)
        .map_err(|e| GitHubError::Configuration(format!("invalid base URI {base_uri}: {e}")))?
        .personal_token(token)
        .build()
        .map_err(GitHubError::transport("build_client"))
}
