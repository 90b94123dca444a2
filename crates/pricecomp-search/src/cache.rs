//! Cache-aside layer for search responses.
//!
//! Values are JSON-encoded [`SearchResponse`]s stored under a canonical key
//! derived from the validated request. Whether a backend is usable is decided
//! once, when [`SearchCache::connect`] pings it; afterwards every operation on
//! an [`SearchCache::Unavailable`] cache is a cheap no-op or a
//! [`CacheError::Unavailable`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use pricecomp_core::{SearchResponse, ValidatedRequest};
use serde::Serialize;
use thiserror::Error;

pub const KEY_PREFIX: &str = "search:";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend is unavailable")]
    Unavailable,

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Field order here is the key layout. Unset filter and sort fields are
/// omitted so requests differing only in defaults share an entry.
#[derive(Serialize)]
struct KeyFields<'a> {
    q: &'a str,
    region: &'a str,
    page: u32,
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    in_stock: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<&'static str>,
}

/// Deterministic cache key for a validated request, `search:{json}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn for_request(request: &ValidatedRequest) -> Self {
        let filter = request.filter();
        let sort = request.sort();
        let fields = KeyFields {
            q: request.query(),
            region: request.region().as_str(),
            page: request.page(),
            limit: request.limit(),
            min_price: filter.and_then(|f| f.min_price),
            max_price: filter.and_then(|f| f.max_price),
            source: filter.and_then(|f| f.source.as_deref()),
            in_stock: filter.and_then(|f| f.in_stock),
            min_rating: filter.and_then(|f| f.min_rating),
            sort: sort.map(|s| s.field.as_str()),
            order: sort.map(|s| s.order.as_str()),
        };
        // Only strings, integers, booleans and finite floats: encoding cannot fail.
        let json = serde_json::to_string(&fields).unwrap_or_default();
        Self(format!("{KEY_PREFIX}{json}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key/value store with per-entry TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name reported by stats, e.g. `"memory"`.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Keys matching a glob where `*` matches any run of characters.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Remaining lifetime of `key`, `None` if absent or expired.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;

    async fn len(&self) -> Result<u64, CacheError>;

    async fn flush(&self) -> Result<(), CacheError>;
}

#[derive(Clone)]
struct StoredValue {
    payload: Arc<str>,
    ttl: Duration,
    stored_at: Instant,
}

impl StoredValue {
    fn remaining(&self) -> Option<Duration> {
        self.ttl.checked_sub(self.stored_at.elapsed())
    }
}

struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process store backed by `moka`, bounded by entry count.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Cache<String, StoredValue>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(max_entries: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self
            .inner
            .get(key)
            .await
            .filter(|v| v.remaining().is_some())
            .map(|v| v.payload.to_string()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let stored = StoredValue {
            payload: Arc::from(value),
            ttl,
            stored_at: Instant::now(),
        };
        self.inner.insert(key.to_string(), stored).await;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut keys: Vec<String> = self
            .inner
            .iter()
            .filter(|(key, value)| value.remaining().is_some() && glob_match(pattern, key))
            .map(|(key, _)| key.as_ref().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        Ok(self.inner.get(key).await.and_then(|v| v.remaining()))
    }

    async fn len(&self) -> Result<u64, CacheError> {
        self.inner.run_pending_tasks().await;
        Ok(self.inner.entry_count())
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
        Ok(())
    }
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return text.is_empty();
    };
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };
    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// Cache state reported by the admin endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<u64>,
}

/// Search-response cache whose availability is fixed at construction.
#[derive(Clone)]
pub enum SearchCache {
    Unavailable,
    Connected {
        store: Arc<dyn CacheStore>,
        ttl: Duration,
    },
}

impl SearchCache {
    /// Pings `store` once; a failed ping yields [`SearchCache::Unavailable`]
    /// for the lifetime of the value.
    pub async fn connect(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        match store.ping().await {
            Ok(()) => {
                tracing::info!(
                    backend = store.backend(),
                    ttl_secs = ttl.as_secs(),
                    "search cache connected"
                );
                Self::Connected { store, ttl }
            }
            Err(e) => {
                tracing::warn!(
                    backend = store.backend(),
                    error = %e,
                    "search cache unavailable, continuing without caching"
                );
                Self::Unavailable
            }
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// `Ok(None)` is a miss. An undecodable payload is logged and also
    /// reported as a miss.
    ///
    /// # Errors
    ///
    /// [`CacheError::Unavailable`] when no backend is connected, or the
    /// backend's own error.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<SearchResponse>, CacheError> {
        let Self::Connected { store, .. } = self else {
            return Err(CacheError::Unavailable);
        };
        let Some(raw) = store.get(key.as_str()).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<SearchResponse>(&raw) {
            Ok(response) => Ok(Some(response)),
            Err(e) => {
                tracing::warn!(%key, error = %e, "discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Best-effort write; failures are logged and swallowed.
    pub async fn put(&self, key: &CacheKey, response: &SearchResponse) {
        let Self::Connected { store, ttl } = self else {
            return;
        };
        let payload = match serde_json::to_string(response) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(%key, error = %e, "failed to encode search response for cache");
                return;
            }
        };
        if let Err(e) = store.set(key.as_str(), payload, *ttl).await {
            tracing::warn!(%key, error = %e, "failed to cache search response");
        } else {
            tracing::debug!(%key, "cached search response");
        }
    }

    /// # Errors
    ///
    /// [`CacheError::Unavailable`] when no backend is connected.
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        match self {
            Self::Connected { store, .. } => store.keys(pattern).await,
            Self::Unavailable => Err(CacheError::Unavailable),
        }
    }

    /// # Errors
    ///
    /// [`CacheError::Unavailable`] when no backend is connected.
    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        match self {
            Self::Connected { store, .. } => store.ttl(key).await,
            Self::Unavailable => Err(CacheError::Unavailable),
        }
    }

    /// # Errors
    ///
    /// [`CacheError::Unavailable`] when no backend is connected.
    pub async fn flush(&self) -> Result<(), CacheError> {
        match self {
            Self::Connected { store, .. } => {
                store.flush().await?;
                tracing::info!("search cache flushed");
                Ok(())
            }
            Self::Unavailable => Err(CacheError::Unavailable),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        match self {
            Self::Connected { store, ttl } => CacheStats {
                status: "connected",
                backend: Some(store.backend()),
                ttl_seconds: Some(ttl.as_secs()),
                entries: store.len().await.ok(),
            },
            Self::Unavailable => CacheStats {
                status: "unavailable",
                backend: None,
                ttl_seconds: None,
                entries: None,
            },
        }
    }
}

impl std::fmt::Debug for SearchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => f.write_str("SearchCache::Unavailable"),
            Self::Connected { store, ttl } => f
                .debug_struct("SearchCache::Connected")
                .field("backend", &store.backend())
                .field("ttl", ttl)
                .finish(),
        }
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
