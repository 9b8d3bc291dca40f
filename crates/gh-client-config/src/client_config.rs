//! Client configuration
//!
//! Configuration loaded from `.gh-pr-automate.toml`, overlaid with the
//! environment. Library code receives a finished [`ClientConfig`]; only the
//! composition root calls [`ClientConfig::discover`].

use crate::{gh_cli, load_config_file, DEFAULT_HOST};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default GitHub REST/GraphQL API root
pub const DEFAULT_BASE_URI: &str = "https://api.github.com";

/// How to reach and authenticate against GitHub
///
/// Credential precedence when a client is built: `token`, then the app
/// key (`pem_key` or `pem_key_path`, with `app_id` and `installation_id`).
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Personal access token (or one cached by the `gh` CLI)
    pub token: Option<String>,

    /// GitHub App id
    pub app_id: Option<u64>,

    /// GitHub App installation id
    pub installation_id: Option<u64>,

    /// Path to the app's PEM private key
    pub pem_key_path: Option<PathBuf>,

    /// Inline PEM private key; wins over `pem_key_path`
    pub pem_key: Option<String>,

    /// Lifetime of cached branch lookups, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// API root, e.g. `https://github.example.com/api/v3` for Enterprise
    #[serde(default = "default_base_uri")]
    pub base_uri: String,

    /// Host name used to find a `gh` CLI token
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_base_uri() -> String {
    DEFAULT_BASE_URI.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: None,
            app_id: None,
            installation_id: None,
            pem_key_path: None,
            pem_key: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            base_uri: default_base_uri(),
            host: default_host(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .field("pem_key_path", &self.pem_key_path)
            .field("pem_key", &self.pem_key.as_ref().map(|_| "<redacted>"))
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("base_uri", &self.base_uri)
            .field("host", &self.host)
            .finish()
    }
}

impl ClientConfig {
    /// Lifetime of cached branch lookups
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Whether an app private key is configured
    pub fn has_app_key(&self) -> bool {
        self.pem_key.as_deref().is_some_and(|k| !k.is_empty()) || self.pem_key_path.is_some()
    }

    /// Whether any credential source is configured
    pub fn has_credentials(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty()) || self.has_app_key()
    }

    /// Load config from CWD first, then the config directories, or use defaults
    pub fn load() -> Self {
        if let Some(content) = load_config_file() {
            match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded client config from file");
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse config file: {}", e);
                }
            }
        }

        log::debug!("Using default client config");
        Self::default()
    }

    /// Configuration from the process environment alone
    pub fn from_env() -> Self {
        Self::default().overlay_env(|key| std::env::var(key).ok())
    }

    /// Override fields with environment values that are set
    ///
    /// Reads `GITHUB_TOKEN` (or `GH_TOKEN`), `GITHUB_APP_ID`,
    /// `GITHUB_INSTALLATION_ID`, `GITHUB_PEM_KEY_LOC`, `GITHUB_PEM_KEY`,
    /// `GITHUB_CACHE_TTL_SECS` and `GITHUB_API_URL`. Empty values and
    /// unparseable numbers count as unset.
    pub fn overlay_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let number = |key: &str| {
            var(key).and_then(|v| match v.parse::<u64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    log::warn!("Ignoring {}: not a number", key);
                    None
                }
            })
        };

        if let Some(token) = var("GITHUB_TOKEN").or_else(|| var("GH_TOKEN")) {
            self.token = Some(token);
        }
        if let Some(app_id) = number("GITHUB_APP_ID") {
            self.app_id = Some(app_id);
        }
        if let Some(installation_id) = number("GITHUB_INSTALLATION_ID") {
            self.installation_id = Some(installation_id);
        }
        if let Some(path) = var("GITHUB_PEM_KEY_LOC") {
            self.pem_key_path = Some(PathBuf::from(path));
        }
        if let Some(pem) = var("GITHUB_PEM_KEY") {
            self.pem_key = Some(pem);
        }
        if let Some(ttl) = number("GITHUB_CACHE_TTL_SECS") {
            self.cache_ttl_secs = ttl;
        }
        if let Some(base_uri) = var("GITHUB_API_URL") {
            self.base_uri = base_uri;
        }
        self
    }

    /// Configuration with every field unset
    ///
    /// Start here to describe overrides for [`ClientConfig::merge`]: empty
    /// strings and a zero TTL count as unset.
    pub fn unset() -> Self {
        Self {
            token: None,
            app_id: None,
            installation_id: None,
            pem_key_path: None,
            pem_key: None,
            cache_ttl_secs: 0,
            base_uri: String::new(),
            host: String::new(),
        }
    }

    /// Fill every unset field from `fallback`; fields set on `self` win
    pub fn merge(self, fallback: &ClientConfig) -> Self {
        fn non_empty(value: String, fallback: &str) -> String {
            if value.is_empty() {
                fallback.to_string()
            } else {
                value
            }
        }

        Self {
            token: self.token.or_else(|| fallback.token.clone()),
            app_id: self.app_id.or(fallback.app_id),
            installation_id: self.installation_id.or(fallback.installation_id),
            pem_key_path: self
                .pem_key_path
                .or_else(|| fallback.pem_key_path.clone()),
            pem_key: self.pem_key.or_else(|| fallback.pem_key.clone()),
            cache_ttl_secs: if self.cache_ttl_secs == 0 {
                fallback.cache_ttl_secs
            } else {
                self.cache_ttl_secs
            },
            base_uri: non_empty(self.base_uri, &fallback.base_uri),
            host: non_empty(self.host, &fallback.host),
        }
    }

    /// Config file, then environment, then the `gh` CLI token as last resort
    ///
    /// Call once at startup and pass the result down.
    pub async fn discover() -> Self {
        Self::discover_with(Self::unset()).await
    }

    /// Like [`ClientConfig::discover`], with `overrides` winning over every
    /// discovered value
    ///
    /// The `gh` CLI is only asked when neither source carries a credential,
    /// and is asked for the host after overrides apply.
    pub async fn discover_with(overrides: ClientConfig) -> Self {
        let discovered = Self::load().overlay_env(|key| std::env::var(key).ok());
        let mut config = overrides.merge(&discovered);

        if !config.has_credentials() {
            if let Some(token) = gh_cli::gh_cli_token(&config.host).await {
                log::info!("Using token cached by the gh CLI for {}", config.host);
                config.token = Some(token);
            }
        }

        config
    }
}
