//! cloudfiles CLI: drives the transfer engine and the config relay
//! against local directories.

mod cli;
mod commands;
mod config;
mod remote;
mod store;

use clap::Parser;
use cloudfiles_transfer::FileFilter;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::CliConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Upload {
            path,
            caller_id,
            accept,
            max_size_mb,
        } => {
            let filter = FileFilter::new(accept.as_deref(), max_size_mb);
            commands::upload(&cfg, &path, caller_id, &filter).await
        }
        Commands::Download { id, name, out } => {
            commands::download(&cfg, &id, name, out).await
        }
        Commands::RelayPut { payload, href } => {
            commands::relay_put(&cfg, &payload, href.as_deref()).await
        }
        Commands::RelayGet {
            config_id,
            timeout_ms,
        } => commands::relay_get(&cfg, &config_id, timeout_ms).await,
        Commands::RelayDrop { config_id } => commands::relay_drop(&cfg, &config_id).await,
    }
}
