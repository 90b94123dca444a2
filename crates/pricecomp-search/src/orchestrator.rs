use std::sync::Arc;
use std::time::{Duration, Instant};

use pricecomp_core::{
    normalize_listings, Region, SearchRequest, SearchResponse, ValidatedRequest, ValidationError,
};

use crate::aggregator::Aggregator;
use crate::cache::{CacheError, CacheKey, SearchCache};
use crate::pipeline::{filter_listings, paginate, sort_listings};
use crate::sources::SourceTable;

/// Entry point for product searches. Stateless across requests apart from
/// the shared cache.
pub struct SearchService {
    sources: Arc<SourceTable>,
    aggregator: Aggregator,
    cache: SearchCache,
    default_region: Region,
    fanout_timeout: Duration,
}

impl SearchService {
    #[must_use]
    pub fn new(
        sources: SourceTable,
        cache: SearchCache,
        default_region: Region,
        fanout_timeout: Duration,
    ) -> Self {
        let sources = Arc::new(sources);
        Self {
            aggregator: Aggregator::new(Arc::clone(&sources)),
            sources,
            cache,
            default_region,
            fanout_timeout,
        }
    }

    /// Validates `request`, answers from cache when possible, and otherwise
    /// fans out to every applicable source.
    ///
    /// Source and cache failures only reduce the result set; they never fail
    /// the call.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for malformed input, before any cache or
    /// source is touched.
    pub async fn search_products(
        &self,
        request: SearchRequest,
    ) -> Result<SearchResponse, ValidationError> {
        let started = Instant::now();
        let request = request.validate(&self.default_region)?;
        let key = CacheKey::for_request(&request);

        match self.cache.get(&key).await {
            Ok(Some(mut cached)) => {
                cached.duration_ms = elapsed_ms(started);
                cached.cached = true;
                tracing::info!(%key, "cache hit");
                return Ok(cached);
            }
            Ok(None) => tracing::info!(%key, "cache miss"),
            Err(CacheError::Unavailable) => {}
            Err(e) => tracing::warn!(%key, error = %e, "cache lookup failed, treating as miss"),
        }

        let response = self.search_sources(&request, started).await;
        self.cache.put(&key, &response).await;
        Ok(response)
    }

    async fn search_sources(&self, request: &ValidatedRequest, started: Instant) -> SearchResponse {
        let deadline = tokio::time::Instant::now() + self.fanout_timeout;
        let aggregate = self
            .aggregator
            .aggregate(request.query(), request.region(), deadline)
            .await;

        let failed_sources = aggregate.failures();
        let sources = aggregate.outcomes.len();

        let mut listings = aggregate.listings;
        normalize_listings(&mut listings);
        let mut listings = filter_listings(listings, request.filter());
        sort_listings(&mut listings, request.sort());
        let page = paginate(listings, request.page(), request.limit());

        tracing::info!(
            query = request.query(),
            region = %request.region(),
            total = page.total,
            sources,
            failed_sources,
            "search complete"
        );

        SearchResponse {
            query: request.query().to_string(),
            products: page.items,
            total: page.total,
            page: request.page(),
            limit: request.limit(),
            total_pages: page.total_pages,
            source: self.sources.source_label(request.region()),
            filters: request.filter().cloned(),
            sort: request.sort(),
            duration_ms: elapsed_ms(started),
            cached: false,
        }
    }

    #[must_use]
    pub fn sources(&self) -> &SourceTable {
        &self.sources
    }

    #[must_use]
    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    #[must_use]
    pub fn default_region(&self) -> &Region {
        &self.default_region
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
