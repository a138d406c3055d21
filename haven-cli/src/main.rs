//! Haven storage CLI
//!
//! Opens the data directory, runs one command against the profile and
//! settings stores, then seals the desktop store the same way the browser
//! does on quit.
//!
//! Usage:
//!   haven profiles list
//!   haven settings set theme '"dark"'
//!   haven history github --limit 5

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use haven_cli::{Command, Haven, HavenConfig};
use haven_crypto::KeychainPlatform;
use haven_settings::EnvSnapshot;
use haven_vault::SealOutcome;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "haven")]
#[command(about = "Inspect and edit Haven profiles and settings")]
struct Args {
    /// Data directory (defaults to $HAVEN_DATA_DIR, then the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = HavenConfig::from_env(args.data_dir);
    debug!(config = ?config, "Starting");
    let haven = Haven::open(
        config,
        Arc::new(KeychainPlatform::new()),
        Arc::new(EnvSnapshot::capture()),
    )
    .await
    .context("failed to open Haven data")?;

    // The store is sealed even when the command fails.
    let result = haven_cli::run(&haven, args.command).await;
    let outcome = haven.shutdown().await;

    let output = result?;
    if !output.is_empty() {
        println!("{output}");
    }
    if let SealOutcome::Failed { reason } = outcome {
        bail!("store not sealed: {reason}");
    }
    Ok(())
}
