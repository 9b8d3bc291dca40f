use crate::paths;
use std::{env, path::PathBuf};

const CONFIG_FILE: &str = ".gh-pr-automate.toml";

/// Load config file content from CWD first, then the config directory, then home
///
/// Searches for the config in:
/// 1. `.gh-pr-automate.toml` in the current working directory
/// 2. `config.toml` in the application config directory
/// 3. `.gh-pr-automate.toml` in the home directory
///
/// Returns the file content if found, None otherwise.
pub fn load_config_file() -> Option<String> {
    // Try current directory first
    if let Ok(content) = std::fs::read_to_string(CONFIG_FILE) {
        log::debug!("Loaded config from {}", CONFIG_FILE);
        return Some(content);
    }

    for candidate in [paths::app_config_path(), get_home_config_path()]
        .into_iter()
        .flatten()
    {
        if let Ok(content) = std::fs::read_to_string(&candidate) {
            log::debug!("Loaded config from {}", candidate.display());
            return Some(content);
        }
    }

    None
}

/// Get the path to the config file in the home directory
///
/// Returns ~/.gh-pr-automate.toml if HOME environment variable is set.
fn get_home_config_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(CONFIG_FILE))
}
