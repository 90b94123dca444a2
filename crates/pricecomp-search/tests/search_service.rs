//! End-to-end behaviour of `SearchService` with in-memory retrievers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pricecomp_core::{Filter, Listing, Region, Retriever, RetrieverError, SearchRequest, ValidationError};
use pricecomp_search::{CacheError, CacheStore, MemoryStore, SearchCache, SearchService, SourceTable};

/// Retriever returning a fixed list of `(name, price)` listings.
struct FixedRetriever {
    name: &'static str,
    items: Vec<(String, String)>,
    calls: AtomicUsize,
}

impl FixedRetriever {
    fn new(name: &'static str, prices: &[&str]) -> Arc<Self> {
        let items = prices
            .iter()
            .enumerate()
            .map(|(i, price)| (format!("{name} item {i}"), (*price).to_string()))
            .collect();
        Arc::new(Self {
            name,
            items,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for FixedRetriever {
    fn name(&self) -> &str {
        self.name
    }

    async fn search(&self, _query: &str, region: &Region) -> Result<Vec<Listing>, RetrieverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .items
            .iter()
            .enumerate()
            .map(|(i, (name, price))| Listing {
                id: format!("{}_{}_{i}", self.name.to_lowercase(), region),
                name: name.clone(),
                price: price.clone(),
                currency: "USD".to_string(),
                price_value: None,
                rating: None,
                reviews: None,
                source: format!("{} {}", self.name, region),
                url: format!("https://example.com/{i}"),
                image: String::new(),
                in_stock: true,
                scraped_at: Utc::now(),
                description: None,
            })
            .collect())
    }
}

struct FailingRetriever {
    calls: AtomicUsize,
}

#[async_trait]
impl Retriever for FailingRetriever {
    fn name(&self) -> &str {
        "Broken"
    }

    async fn search(&self, _query: &str, _region: &Region) -> Result<Vec<Listing>, RetrieverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RetrieverError::Parse {
            source_name: "Broken".to_string(),
            message: "no results container".to_string(),
        })
    }
}

struct HangingRetriever;

#[async_trait]
impl Retriever for HangingRetriever {
    fn name(&self) -> &str {
        "Hanging"
    }

    async fn search(&self, _query: &str, _region: &Region) -> Result<Vec<Listing>, RetrieverError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

/// Memory store that counts reads and writes.
struct CountingStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl CountingStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(100),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    fn backend(&self) -> &'static str {
        "counting"
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value, ttl).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        self.inner.keys(pattern).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        self.inner.ttl(key).await
    }

    async fn len(&self) -> Result<u64, CacheError> {
        self.inner.len().await
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.inner.flush().await
    }
}

fn india() -> Region {
    Region::parse("IN").unwrap()
}

fn service(table: SourceTable, cache: SearchCache) -> SearchService {
    SearchService::new(table, cache, india(), Duration::from_secs(5))
}

async fn cached_service(table: SourceTable) -> (SearchService, Arc<CountingStore>) {
    let store = CountingStore::new();
    let cache = SearchCache::connect(store.clone(), Duration::from_secs(600)).await;
    (service(table, cache), store)
}

#[tokio::test]
async fn empty_query_fails_without_touching_cache_or_sources() {
    let source = FixedRetriever::new("Amazon", &["$10"]);
    let (service, store) = cached_service(SourceTable::new().global(source.clone())).await;

    let err = service
        .search_products(SearchRequest::new("   "))
        .await
        .unwrap_err();

    assert_eq!(err, ValidationError::EmptyQuery);
    assert_eq!(source.calls(), 0);
    assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    assert_eq!(store.sets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn inverted_price_range_fails_before_aggregation() {
    let source = FixedRetriever::new("Amazon", &["$10"]);
    let service = service(SourceTable::new().global(source.clone()), SearchCache::Unavailable);

    let filter = Filter {
        min_price: Some(500.0),
        max_price: Some(100.0),
        ..Filter::default()
    };
    let err = service
        .search_products(SearchRequest::new("laptop").filter(filter))
        .await
        .unwrap_err();

    assert_eq!(err, ValidationError::InvertedPriceRange);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn identical_requests_are_served_from_cache() {
    let source = FixedRetriever::new("Amazon", &["$30", "$10", "$20"]);
    let (service, store) = cached_service(SourceTable::new().global(source.clone())).await;
    let request = SearchRequest::new("laptop").sort("price", "asc");

    let first = service.search_products(request.clone()).await.unwrap();
    let second = service.search_products(request).await.unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(source.calls(), 1);
    assert_eq!(store.sets.load(Ordering::SeqCst), 1);

    let mut second = second;
    second.cached = first.cached;
    second.duration_ms = first.duration_ms;
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[tokio::test]
async fn failing_source_is_absorbed() {
    let broken = Arc::new(FailingRetriever {
        calls: AtomicUsize::new(0),
    });
    let healthy = FixedRetriever::new("eBay", &["$1", "$2", "$3"]);
    let table = SourceTable::new().global(broken.clone()).global(healthy);
    let service = service(table, SearchCache::Unavailable);

    let response = service
        .search_products(SearchRequest::new("laptop"))
        .await
        .unwrap();

    assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
    assert_eq!(response.total, 3);
    assert!(response.products.iter().all(|l| l.source == "eBay IN"));
}

#[tokio::test]
async fn every_source_failing_still_succeeds_with_no_products() {
    let broken = Arc::new(FailingRetriever {
        calls: AtomicUsize::new(0),
    });
    let service = service(SourceTable::new().global(broken), SearchCache::Unavailable);

    let response = service
        .search_products(SearchRequest::new("laptop"))
        .await
        .unwrap();

    assert!(response.products.is_empty());
    assert_eq!(response.total, 0);
    assert_eq!(response.total_pages, 0);
}

#[tokio::test]
async fn pagination_over_filtered_total() {
    let prices: Vec<String> = (1..=25).map(|i| format!("${i}")).collect();
    let prices: Vec<&str> = prices.iter().map(String::as_str).collect();
    let source = FixedRetriever::new("Amazon", &prices);
    let service = service(SourceTable::new().global(source), SearchCache::Unavailable);

    let page3 = service
        .search_products(SearchRequest::new("laptop").page(3).limit(10))
        .await
        .unwrap();
    assert_eq!(page3.products.len(), 5);
    assert_eq!(page3.products[0].name, "Amazon item 20");
    assert_eq!(page3.total, 25);
    assert_eq!(page3.total_pages, 3);

    let page4 = service
        .search_products(SearchRequest::new("laptop").page(4).limit(10))
        .await
        .unwrap();
    assert!(page4.products.is_empty());
    assert_eq!(page4.total_pages, 3);
}

#[tokio::test]
async fn results_are_normalized_and_sorted() {
    let source = FixedRetriever::new("Amazon", &["$30", "$10", "$20"]);
    let service = service(SourceTable::new().global(source), SearchCache::Unavailable);

    let response = service
        .search_products(SearchRequest::new("laptop").sort("price", "asc"))
        .await
        .unwrap();

    let prices: Vec<Option<f64>> = response.products.iter().map(|l| l.price_value).collect();
    assert_eq!(prices, [Some(10.0), Some(20.0), Some(30.0)]);
}

#[tokio::test]
async fn region_gated_source_is_not_invoked_for_other_regions() {
    let global = FixedRetriever::new("Amazon", &["$10"]);
    let us_only = FixedRetriever::new("Walmart", &["$5", "$6"]);
    let table = SourceTable::new()
        .global(global.clone())
        .regional(["US"], us_only.clone());
    let service = service(table, SearchCache::Unavailable);

    let response = service
        .search_products(SearchRequest::new("laptop").region("in"))
        .await
        .unwrap();

    assert_eq!(us_only.calls(), 0);
    assert_eq!(global.calls(), 1);
    assert_eq!(response.total, 1);
    assert_eq!(response.source, "Amazon");

    let response = service
        .search_products(SearchRequest::new("laptop").region("us"))
        .await
        .unwrap();
    assert_eq!(us_only.calls(), 1);
    assert_eq!(response.total, 3);
    assert_eq!(response.source, "Amazon, Walmart");
}

#[tokio::test(start_paused = true)]
async fn hung_source_cannot_stall_the_request() {
    let fast = FixedRetriever::new("Amazon", &["$10"]);
    let table = SourceTable::new()
        .global(Arc::new(HangingRetriever))
        .global(fast);
    let service = SearchService::new(
        table,
        SearchCache::Unavailable,
        india(),
        Duration::from_secs(2),
    );

    let response = service
        .search_products(SearchRequest::new("laptop"))
        .await
        .unwrap();

    assert_eq!(response.total, 1);
}

#[tokio::test]
async fn default_region_applied_and_echoed_fields() {
    let source = FixedRetriever::new("Flipkart", &["₹1,499"]);
    let table = SourceTable::new().regional(["IN"], source.clone());
    let service = service(table, SearchCache::Unavailable);

    let filter = Filter {
        in_stock: Some(true),
        ..Filter::default()
    };
    let response = service
        .search_products(SearchRequest::new(" shoes ").filter(filter.clone()))
        .await
        .unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(response.query, "shoes");
    assert_eq!(response.page, 1);
    assert_eq!(response.limit, 10);
    assert_eq!(response.filters, Some(filter));
    assert_eq!(response.products[0].price_value, Some(1499.0));
    assert_eq!(response.products[0].source, "Flipkart IN");
}
