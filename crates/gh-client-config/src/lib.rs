//! Configuration for gh-client
//!
//! This crate provides:
//! - The explicit client configuration (ClientConfig)
//! - Configuration file loading (TOML)
//! - Environment overlay (`GITHUB_TOKEN`, `GITHUB_APP_ID`, ...)
//! - Token discovery through the `gh` CLI

pub mod client_config;
pub mod config_file;
pub mod gh_cli;
pub mod paths;

/// Default GitHub host (public GitHub)
pub const DEFAULT_HOST: &str = "github.com";

pub use client_config::{ClientConfig, DEFAULT_BASE_URI};
pub use config_file::load_config_file;
pub use gh_cli::gh_cli_token;
