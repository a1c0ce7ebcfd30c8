use anyhow::Result;
use city_core::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod load;
mod progress;

#[derive(Parser)]
#[command(name = "city-importer")]
#[command(about = "GeoNames city importer for the search store", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a GeoNames cities file into the store
    Load {
        /// Path to the GeoNames cities file (e.g., cities15000.txt)
        #[arg(short, long)]
        input: PathBuf,

        /// Optional admin1CodesASCII.txt file for subdivision names
        #[arg(long)]
        admin1: Option<PathBuf>,

        /// SQLite connection string (defaults to DATABASE_URL)
        #[arg(short, long)]
        database: Option<String>,

        /// Rows per insert transaction
        #[arg(long, default_value = "1000")]
        batch_size: usize,
    },

    /// Show store statistics
    Stats {
        /// SQLite connection string (defaults to DATABASE_URL)
        #[arg(short, long)]
        database: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Load {
            input,
            admin1,
            database,
            batch_size,
        } => {
            let database_url = database.unwrap_or_else(|| config.database_url.clone());
            load::run(&database_url, &input, admin1.as_deref(), batch_size).await?;
        }

        Commands::Stats { database } => {
            let database_url = database.unwrap_or_else(|| config.database_url.clone());
            load::stats(&database_url).await?;
        }
    }

    Ok(())
}
