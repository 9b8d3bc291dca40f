mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use gh_client::{CachedGitHubClient, OctocrabClient};
use gh_client_config::ClientConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the logger so RUST_LOG can live there too
    let dotenv = dotenvy::dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match dotenv {
        Ok(path) => log::debug!("Loaded .env file from: {:?}", path),
        Err(_) => log::debug!(".env file not found, will rely on environment variables"),
    }

    let Cli { client, command } = Cli::parse();

    let config = ClientConfig::discover_with(client.overrides()).await;
    log::debug!("Using {:?}", config);

    let live = OctocrabClient::from_config(&config)
        .await
        .context("failed to set up GitHub client")?;
    let client = CachedGitHubClient::new(live, config.cache_ttl());

    let output = commands::run(&client, command).await?;
    println!("{output}");

    Ok(())
}
