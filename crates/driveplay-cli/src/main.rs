//! Driveplay CLI - headless playlist driver
//!
//! Features:
//! - Catalog inspection (local JSON snapshot or HTTP listing endpoint)
//! - Source ladder preview for a drive file id
//! - Scripted playback runs through the real controller
//! - Effective configuration dump

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Driveplay CLI - cloud-drive playlist toolkit
#[derive(Parser)]
#[command(name = "driveplay")]
#[command(version)]
#[command(about = "Drive video playlist inspection and playback simulation", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Controller configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the playable items of a catalog
    Inspect {
        /// Catalog JSON file, or base URL of a listing service
        source: String,

        /// Folder to list when the source is a listing service
        #[arg(long, default_value = "root")]
        folder: String,
    },

    /// Show the delivery strategies tried for a file
    Strategies {
        /// Drive file id
        item_id: String,
    },

    /// Run a playlist against scripted surfaces
    Simulate {
        /// Catalog JSON file, or base URL of a listing service
        source: String,

        /// Folder to list when the source is a listing service
        #[arg(long, default_value = "root")]
        folder: String,

        /// Item to start with (defaults to the first)
        #[arg(short, long)]
        initial: Option<String>,

        /// Comma separated surface behaviour per mount (load, fail, end, silent, reject)
        #[arg(short, long, default_value = "end")]
        script: String,

        /// Behaviour once the script runs out
        #[arg(long, default_value = "end")]
        then: String,

        /// Override the per-source load timeout
        #[arg(long)]
        load_timeout_ms: Option<u64>,

        /// Give up after this many seconds
        #[arg(long, default_value = "60")]
        max_duration: u64,
    },

    /// Print the effective controller configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so JSON output stays clean
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { source, folder } => {
            commands::inspect(&source, &folder, &cli.format).await?;
        }
        Commands::Strategies { item_id } => {
            commands::strategies(&item_id, &config, &cli.format)?;
        }
        Commands::Simulate {
            source,
            folder,
            initial,
            script,
            then,
            load_timeout_ms,
            max_duration,
        } => {
            let run = commands::SimulateArgs {
                source,
                folder,
                initial,
                script,
                then,
                load_timeout_ms,
                max_duration,
            };
            commands::simulate(run, config, &cli.format).await?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
