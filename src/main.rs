//! # Evalia
//!
//! Status-lifecycle service for evaluation periods.
//!
//! Usage:
//!   evalia serve                     # Start the HTTP gateway
//!   evalia serve --port 8080         # Custom port
//!   evalia reconcile                 # One sweep (run this from cron)
//!   evalia reconcile --period-id ID  # Reconcile a single period
//!   evalia inspect                   # Dry run — what would a sweep change?

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use evalia_core::EvaliaConfig;
use evalia_lifecycle::Reconciler;
use evalia_store::SqliteStore;

#[derive(Parser)]
#[command(
    name = "evalia",
    version,
    about = "📅 Evalia — evaluation-period status lifecycle service"
)]
struct Cli {
    /// Path to config file (default: ~/.evalia/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP gateway
    Serve {
        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the listen host
        #[arg(long)]
        host: Option<String>,
    },
    /// Run one reconciliation pass and print the report
    Reconcile {
        /// Reconcile only this period
        #[arg(long)]
        period_id: Option<uuid::Uuid>,
    },
    /// Dry run — report which periods need a status update, write nothing
    Inspect,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn open_store(config: &EvaliaConfig) -> Result<Arc<SqliteStore>> {
    let path = PathBuf::from(expand_path(&config.database.path));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(SqliteStore::open(&path)?))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "evalia=debug,evalia_gateway=debug,evalia_lifecycle=debug,tower_http=debug"
    } else {
        "evalia=info,evalia_gateway=info,evalia_lifecycle=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => EvaliaConfig::load_from(Path::new(&expand_path(path)))?,
        None => EvaliaConfig::load()?,
    };

    match cli.command {
        Command::Serve { port, host } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(host) = host {
                config.gateway.host = host;
            }
            evalia_gateway::start(&config).await
        }
        Command::Reconcile { period_id } => {
            let store = open_store(&config)?;
            let reconciler = Reconciler::new(store);
            match period_id {
                Some(id) => {
                    let outcome = reconciler.reconcile_one(id)?;
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                }
                None => {
                    let report = reconciler.reconcile_all()?;
                    tracing::info!(
                        "Sweep complete: {} transition(s) applied",
                        report.updated_count
                    );
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
            Ok(())
        }
        Command::Inspect => {
            let store = open_store(&config)?;
            let reconciler = Reconciler::new(store);
            let report = reconciler.inspect_pending()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}
