mod api;
mod cli;
mod config;
mod db;
mod error;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "courtforge")]
#[command(about = "Canonical NBA team and game entities from historical elo data")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and seed default team aliases
    InitDb,
    /// Replace the raw game (and optionally alias) tables from CSV files
    Load {
        #[arg(short, long)]
        games: PathBuf,
        #[arg(short, long)]
        aliases: Option<PathBuf>,
    },
    /// Recompute and publish teams and team-game facts
    Run {
        /// Run date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Report data quality of the raw game table
    Check,
    /// Export season metrics and published tables to CSV
    Export,
    /// Query team statistics
    Team {
        #[arg(short, long)]
        name: String,
    },
    /// Start the read-only API server
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::InitDb) => {
            tracing::info!("Initializing database...");
            cli::init_db(&config).await?;
        }
        Some(Commands::Load { games, aliases }) => {
            tracing::info!("Loading raw data from {}", games.display());
            cli::load_data(&config, &games, aliases.as_deref()).await?;
        }
        Some(Commands::Run { as_of }) => {
            tracing::info!("Starting pipeline run");
            cli::run_pipeline(&config, as_of.as_deref()).await?;
        }
        Some(Commands::Check) => {
            cli::check_data(&config).await?;
        }
        Some(Commands::Export) => {
            tracing::info!("Exporting metrics to {}", config.export_dir);
            cli::export_metrics(&config).await?;
        }
        Some(Commands::Team { name }) => {
            tracing::info!("Querying team: {}", name);
            cli::query_team(&config, &name).await?;
        }
        Some(Commands::Serve { port }) => {
            tracing::info!("Starting CourtForge API server on port {}", port);
            api::serve(&config, port).await?;
        }
        None => {
            // Default to serving
            tracing::info!("Starting CourtForge API server on port 3000");
            api::serve(&config, 3000).await?;
        }
    }

    Ok(())
}
