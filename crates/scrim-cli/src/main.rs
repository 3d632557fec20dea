//! Scrim CLI - Headless demo player
//!
//! Features:
//! - Play a URL or catalogue id through the simulated engine
//! - List the demo catalogue
//! - Run the version-gated disk cache setup

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Scrim CLI - Playback coordinator demo
#[derive(Parser)]
#[command(name = "scrim-cli")]
#[command(version)]
#[command(about = "Headless demo of the Scrim playback coordinator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a URL or demo catalogue id
    Play {
        /// Media URL or catalogue id
        target: String,

        /// Start position in seconds
        #[arg(short, long, default_value = "0")]
        seek: f64,

        /// Player configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stop after this many seconds (0 = until end of media)
        #[arg(short, long, default_value = "0")]
        run_for: u64,
    },

    /// List the demo catalogue
    Catalog,

    /// Configure the disk cache, cleaning it on a schema upgrade
    Cache {
        /// Cache directory
        #[arg(short, long)]
        dir: PathBuf,

        /// Schema version file (defaults to DIR/.scrim-version.json)
        #[arg(long)]
        version_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .init();
    scrim_core::init();

    match cli.command {
        Commands::Play { target, seek, config, run_for } => {
            commands::play(&target, seek, config, run_for, &cli.format).await?;
        }
        Commands::Catalog => {
            commands::catalog(&cli.format)?;
        }
        Commands::Cache { dir, version_file } => {
            commands::cache(dir, version_file, &cli.format)?;
        }
    }

    Ok(())
}
