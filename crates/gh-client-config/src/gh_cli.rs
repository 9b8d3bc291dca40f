//! Token discovery through the GitHub CLI
//!
//! Tries, in order:
//! 1. `oauth_token` for the host in `~/.config/gh/hosts.yml`
//! 2. `gh auth token --hostname {host}` (covers tokens kept in the OS keyring)

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::process::Command;

#[derive(Debug, Deserialize)]
struct HostAuth {
    oauth_token: Option<String>,
}

/// Token the `gh` CLI holds for `host`, if any
pub async fn gh_cli_token(host: &str) -> Option<String> {
    match hosts_file_token(host) {
        Some(token) => Some(token),
        None => gh_auth_token(host).await,
    }
}

/// Location of the `gh` CLI hosts file
pub fn hosts_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("gh").join("hosts.yml"))
}

fn hosts_file_token(host: &str) -> Option<String> {
    let path = hosts_file_path()?;
    let content = std::fs::read_to_string(&path).ok()?;
    let token = token_from_hosts(&content, host);
    if token.is_some() {
        log::debug!("Found token for {} in {}", host, path.display());
    }
    token
}

/// Extract the token for `host` from the contents of a `hosts.yml` file
///
/// Older CLI versions wrote capitalized host keys (`Github.com`), so both
/// spellings are accepted.
pub fn token_from_hosts(content: &str, host: &str) -> Option<String> {
    let hosts: HashMap<String, HostAuth> = match serde_yaml::from_str(content) {
        Ok(hosts) => hosts,
        Err(e) => {
            log::warn!("Failed to parse gh hosts file: {}", e);
            return None;
        }
    };

    [host.to_string(), capitalize(host)]
        .iter()
        .filter_map(|key| hosts.get(key))
        .find_map(|auth| auth.oauth_token.clone().filter(|t| !t.is_empty()))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

async fn gh_auth_token(host: &str) -> Option<String> {
    log::debug!("Trying gh auth token for host {}", host);
    let output = match Command::new("gh")
        .args(["auth", "token", "--hostname", host])
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            log::debug!("Failed to run 'gh auth token': {}", e);
            return None;
        }
    };

    if !output.status.success() {
        return None;
    }

    let token = String::from_utf8(output.stdout).ok()?.trim().to_string();
    if token.is_empty() {
        None
    } else {
        log::debug!("Using token from gh CLI for host {}", host);
        Some(token)
    }
}
