// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod relay;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::RelayConfig;

pub use relay::RelayStack;

/// Image relay with persistent dedup history
#[derive(Parser, Debug)]
#[command(name = "picrelay")]
#[command(version)]
#[command(about = "Relay image posts to a channel, publishing each one at most once", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the source pollers (default)
    Run,

    /// Remove a published record from the history
    Delete(relay::DeleteArgs),

    /// Load the remote key list and report its size
    SyncHistory(relay::SyncArgs),

    /// Print build and feature information as JSON
    Info,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = RelayConfig::from_env();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => relay::run(config).await,
        Commands::Delete(args) => relay::delete(config, args).await,
        Commands::SyncHistory(args) => relay::sync_history(config, args).await,
        Commands::Info => {
            println!(
                "{}",
                serde_json::to_string_pretty(&crate::version::get_version_info())?
            );
            Ok(())
        }
    }
}
