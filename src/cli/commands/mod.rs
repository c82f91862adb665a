//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod catalog;
mod check;
mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::runtime::RuntimeConfigStore;
use crate::services::{Refresher, Scheduler, StockCache};

#[derive(Parser)]
#[command(name = "stockwatch")]
#[command(about = "Store pickup availability poller with a web dashboard")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./stockwatch.toml when present)
    #[arg(short, long, global = true, env = "STOCKWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check for the verbose flag before clap runs, so logging can be set up first.
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the background poller and the web server
    Serve {
        /// Address to bind: PORT, HOST or HOST:PORT (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Serve the API without starting the background refresh loop
        #[arg(long)]
        no_background: bool,
    },

    /// Fetch availability for one SKU and print it
    Check {
        /// Display name or part code
        sku: String,
    },

    /// List the catalog
    Catalog,
}

/// Wire the upstream client, cache, runtime config and scheduler together.
pub(crate) fn build_scheduler(settings: &Settings) -> anyhow::Result<Scheduler> {
    let catalog = Arc::new(settings.build_catalog());
    let client = Arc::new(settings.upstream.build_client()?);
    let cache = Arc::new(StockCache::new(&catalog));
    let runtime = Arc::new(RuntimeConfigStore::new(settings.runtime.clone()));
    let refresher = Refresher::new(client, cache, runtime, settings.retry.policy());
    Ok(Scheduler::new(catalog, refresher))
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            bind,
            no_background,
        } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            serve::cmd_serve(&settings, &bind, !no_background).await
        }
        Commands::Check { sku } => check::cmd_check(&settings, &sku).await,
        Commands::Catalog => catalog::cmd_catalog(&settings),
    }
}
