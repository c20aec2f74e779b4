mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "finnews-cli")]
#[command(about = "Financial news ingest, enrichment and search")]
struct Cli {
    /// Keep articles in process memory instead of Postgres
    #[arg(long, global = true)]
    in_memory: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch every configured feed and print the normalized articles
    Fetch {
        /// Maximum number of articles to print
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run the pipeline once over freshly fetched articles
    Run {
        /// Maximum number of fetched articles to process
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Search indexed articles
    Query {
        /// Free-text query
        text: String,
        /// Number of results to return
        #[arg(long, default_value = "5")]
        top_k: usize,
    },
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = finnews_core::load_app_config()?;
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Fetch { limit }) => commands::run_fetch(&config, limit).await?,
        Some(Commands::Run { limit }) => {
            commands::run_pipeline(&config, cli.in_memory, limit).await?;
        }
        Some(Commands::Query { text, top_k }) => {
            commands::run_query(&config, &text, top_k).await?;
        }
        Some(Commands::Migrate) => commands::run_migrate(&config).await?,
        None => println!("finnews-cli: pass --help to list commands"),
    }

    Ok(())
}

#[cfg(test)]
mod tests;
