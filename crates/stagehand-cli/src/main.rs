//! Stagehand CLI
//!
//! Developer tool for running and inspecting batch ETL jobs.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod credentials;
mod factory;
mod local_db;

/// Stagehand - Batch warehouse ETL pipelines
#[derive(Parser)]
#[command(name = "stagehand")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "stagehand.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Stagehand project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Run warehouse pipeline jobs
    Run {
        /// Run a specific job only
        #[arg(short, long)]
        job: Option<String>,
    },

    /// Run discovery-then-load extract jobs
    Extract {
        /// Run a specific job only
        #[arg(short, long)]
        job: Option<String>,
    },

    /// Run API feed jobs
    Feed {
        /// Run a specific job only
        #[arg(short, long)]
        job: Option<String>,
    },

    /// Print the declared pipeline stages of warehouse jobs
    Plan {
        /// Show a specific job only
        #[arg(short, long)]
        job: Option<String>,
    },

    /// Validate configuration without running
    Validate,

    /// Show project status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref()).await?;
        }
        Commands::Run { job } => {
            commands::run::run(&cli.config, job.as_deref()).await?;
        }
        Commands::Extract { job } => {
            commands::extract::run(&cli.config, job.as_deref()).await?;
        }
        Commands::Feed { job } => {
            commands::feed::run(&cli.config, job.as_deref()).await?;
        }
        Commands::Plan { job } => {
            commands::plan::run(&cli.config, job.as_deref()).await?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config).await?;
        }
        Commands::Status => {
            commands::status::run(&cli.config).await?;
        }
    }

    Ok(())
}
