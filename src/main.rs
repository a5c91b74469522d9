use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tasklens::Result;
use tasklens::commands::{init_config, run_search, show_config};

#[derive(Parser)]
#[command(name = "tasklens")]
#[command(about = "Semantic search over tasks and their chat messages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or initialize the configuration
    Config {
        /// Write the default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
    /// Search a fixture of tasks and messages
    Search {
        /// Query text
        query: String,
        /// Path to a JSON fixture with tasks and messages
        #[arg(long)]
        fixture: PathBuf,
        /// Maximum number of results to return
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { init } => {
            if init {
                init_config()?;
            } else {
                show_config()?;
            }
        }
        Commands::Search {
            query,
            fixture,
            limit,
        } => {
            run_search(&query, &fixture, limit).await?;
        }
    }

    Ok(())
}
