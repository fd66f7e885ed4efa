//! Quayside CLI - store setup checks and search maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Check the store can take orders (zones, shipping, payment methods)
//! qs-cli setup check
//!
//! # Rebuild the search index and wait for it to finish
//! qs-cli search reindex --timeout-secs 300
//! ```
//!
//! # Commands
//!
//! - `setup check` - Report configuration gaps that break checkout
//! - `search reindex` - Rebuild the engine's search index
//!
//! Connection settings come from the `ADMIN_*` environment variables read by
//! [`quayside_admin::AdminConfig`].

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "qs-cli")]
#[command(author, version, about = "Quayside CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Inspect store configuration
    Setup {
        #[command(subcommand)]
        action: SetupAction,
    },
    /// Manage the search index
    Search {
        #[command(subcommand)]
        action: SearchAction,
    },
}

#[derive(Debug, Subcommand)]
enum SetupAction {
    /// Check zones, shipping methods and payment methods
    Check,
}

#[derive(Debug, Subcommand)]
enum SearchAction {
    /// Rebuild the search index
    Reindex {
        /// Seconds to wait for the reindex job before giving up
        #[arg(long, default_value_t = 600)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() {
    // Load .env before tracing so RUST_LOG can live there
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qs_cli=info,quayside_admin=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Setup { action } => match action {
            SetupAction::Check => commands::setup::check().await?,
        },
        Commands::Search { action } => match action {
            SearchAction::Reindex { timeout_secs } => {
                commands::search::reindex(Duration::from_secs(timeout_secs)).await?;
            }
        },
    }
    Ok(())
}
