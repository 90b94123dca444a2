mod api;
mod middleware;
mod rate_limit;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use pricecomp_core::AppConfig;
use pricecomp_scraper::HttpFetcher;
use pricecomp_search::{MemoryStore, SearchCache, SearchService, SourceTable};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    rate_limit::RateLimiter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = pricecomp_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let service = build_service(&config).await?;
    tracing::info!(
        env = %config.env,
        sources = service.sources().len(),
        default_region = %config.default_region,
        "search service ready"
    );

    let state = AppState {
        service: Arc::new(service),
        limiter: Arc::new(
            RateLimiter::with_system_clock(config.rate_limit_per_sec, config.rate_limit_burst)
                .with_max_clients(
                    usize::try_from(config.rate_limit_max_clients).unwrap_or(usize::MAX),
                ),
        ),
        trust_forwarded_for: config.trust_forwarded_for,
    };
    if config.trust_forwarded_for {
        tracing::info!("rate limiting by x-forwarded-for");
    }
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn build_service(config: &AppConfig) -> anyhow::Result<SearchService> {
    let fetcher = Arc::new(HttpFetcher::new(
        config.scraper_request_timeout_secs,
        &config.scraper_user_agent,
        config.scraper_max_retries,
        config.scraper_retry_backoff_base_secs,
    )?);
    let sources = pricecomp_scraper::default_retrievers(&fetcher)
        .into_iter()
        .fold(SourceTable::new(), |table, (coverage, retriever)| {
            table.register(coverage, retriever)
        });

    let cache = if config.cache_enabled {
        SearchCache::connect(
            Arc::new(MemoryStore::new(config.cache_max_entries)),
            Duration::from_secs(config.cache_ttl_secs),
        )
        .await
    } else {
        tracing::info!("search cache disabled by configuration");
        SearchCache::Unavailable
    };

    Ok(SearchService::new(
        sources,
        cache,
        config.default_region.clone(),
        Duration::from_secs(config.fanout_timeout_secs),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
