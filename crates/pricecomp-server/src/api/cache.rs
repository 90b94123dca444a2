use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use pricecomp_search::{cache::KEY_PREFIX, CacheStats};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_cache_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct CacheKeyInfo {
    key: String,
    /// `None` when the entry expired between listing and lookup.
    ttl_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(super) struct CacheDebug {
    total_keys: usize,
    keys: Vec<CacheKeyInfo>,
    stats: CacheStats,
}

#[derive(Debug, Serialize)]
pub(super) struct FlushResult {
    flushed: bool,
    flushed_at: DateTime<Utc>,
}

fn unavailable(request_id: String) -> ApiError {
    ApiError::new(request_id, "cache_unavailable", "cache not available")
}

pub(super) async fn cache_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<CacheStats>>, ApiError> {
    let cache = state.service.cache();
    if !cache.is_available() {
        return Err(unavailable(req_id.0));
    }
    Ok(ApiResponse::new(cache.stats().await, req_id.0))
}

pub(super) async fn cache_debug(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<CacheDebug>>, ApiError> {
    let cache = state.service.cache();
    let names = cache
        .keys(&format!("{KEY_PREFIX}*"))
        .await
        .map_err(|e| map_cache_error(req_id.0.clone(), &e))?;

    let mut keys = Vec::with_capacity(names.len());
    for key in names {
        let ttl = cache
            .ttl(&key)
            .await
            .map_err(|e| map_cache_error(req_id.0.clone(), &e))?;
        keys.push(CacheKeyInfo {
            key,
            ttl_seconds: ttl.map(|d| d.as_secs()),
        });
    }

    Ok(ApiResponse::new(
        CacheDebug {
            total_keys: keys.len(),
            keys,
            stats: cache.stats().await,
        },
        req_id.0,
    ))
}

pub(super) async fn flush_cache(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<FlushResult>>, ApiError> {
    state
        .service
        .cache()
        .flush()
        .await
        .map_err(|e| map_cache_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        FlushResult {
            flushed: true,
            flushed_at: Utc::now(),
        },
        req_id.0,
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::super::test_support::{send, test_app};

    #[tokio::test]
    async fn cache_endpoints_are_503_without_a_cache() {
        let (app, _) = test_app(false, 20).await;
        for (method, uri) in [
            ("GET", "/cache/stats"),
            ("GET", "/cache/debug"),
            ("DELETE", "/cache/flush"),
        ] {
            let (status, body) = send(&app, method, uri).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{method} {uri}");
            assert_eq!(body["error"]["code"], "cache_unavailable");
        }
    }

    #[tokio::test]
    async fn debug_lists_cached_searches_and_flush_clears_them() {
        let (app, _) = test_app(true, 50).await;
        send(&app, "GET", "/search?q=laptop").await;
        send(&app, "GET", "/search?q=laptop&page=2").await;

        let (status, body) = send(&app, "GET", "/cache/debug").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_keys"], 2);
        let first = &body["data"]["keys"][0];
        assert!(first["key"].as_str().unwrap().starts_with("search:"));
        assert!(first["ttl_seconds"].as_u64().unwrap() <= 600);

        let (status, body) = send(&app, "GET", "/cache/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "connected");
        assert_eq!(body["data"]["ttl_seconds"], 600);

        let (status, body) = send(&app, "DELETE", "/cache/flush").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["flushed"], true);

        let (_, body) = send(&app, "GET", "/cache/debug").await;
        assert_eq!(body["data"]["total_keys"], 0);
    }
}
