mod search;
mod sources;

use std::{sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use pricecomp_core::AppConfig;
use pricecomp_scraper::HttpFetcher;
use pricecomp_search::{SearchCache, SearchService, SourceTable};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pricecomp-cli")]
#[command(about = "Compare product prices across storefronts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search every storefront serving a region
    Search(search::SearchArgs),
    /// List the configured sources
    Sources {
        /// Only show sources consulted for this region (e.g., IN)
        #[arg(long)]
        region: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = pricecomp_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let table = build_sources(&config)?;
    tracing::debug!(sources = table.len(), env = %config.env, "source table built");

    match cli.command {
        Commands::Search(args) => {
            // A cache would not outlive this process.
            let service = SearchService::new(
                table,
                SearchCache::Unavailable,
                config.default_region.clone(),
                Duration::from_secs(config.fanout_timeout_secs),
            );
            search::run_search(&service, args).await?;
        }
        Commands::Sources { region } => {
            sources::run_sources(&table, region.as_deref(), &config.default_region);
        }
    }

    Ok(())
}

fn build_sources(config: &AppConfig) -> anyhow::Result<SourceTable> {
    let fetcher = Arc::new(
        HttpFetcher::new(
            config.scraper_request_timeout_secs,
            &config.scraper_user_agent,
            config.scraper_max_retries,
            config.scraper_retry_backoff_base_secs,
        )
        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?,
    );
    Ok(pricecomp_scraper::default_retrievers(&fetcher)
        .into_iter()
        .fold(SourceTable::new(), |table, (coverage, retriever)| {
            table.register(coverage, retriever)
        }))
}
