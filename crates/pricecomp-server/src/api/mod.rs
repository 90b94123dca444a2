mod cache;
mod info;
mod search;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use pricecomp_search::{CacheError, SearchService};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{enforce_rate_limit, request_id, ClientId, RequestId};
use crate::rate_limit::{BucketStatus, RateLimiter};

pub const SERVICE_NAME: &str = "pricecomp";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
    pub limiter: Arc<RateLimiter>,
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    cache: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "cache_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_cache_error(request_id: String, error: &CacheError) -> ApiError {
    match error {
        CacheError::Unavailable => {
            ApiError::new(request_id, "cache_unavailable", "cache not available")
        }
        other => {
            tracing::error!(error = %other, "cache operation failed");
            ApiError::new(request_id, "internal_error", "cache operation failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
        .expose_headers([HeaderName::from_static("x-request-id")])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search::search))
        .route("/cache/stats", get(cache::cache_stats))
        .route("/cache/debug", get(cache::cache_debug))
        .route("/cache/flush", delete(cache::flush_cache))
        .route("/rate-limit/status", get(rate_limit_status))
        .route("/api/info", get(info::api_info))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    enforce_rate_limit,
                )),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let cache = if state.service.cache().is_available() {
        "connected"
    } else {
        "unavailable"
    };
    ApiResponse::new(
        HealthData {
            status: "healthy",
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            cache,
        },
        req_id.0,
    )
}

async fn rate_limit_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(client): Extension<ClientId>,
) -> Json<ApiResponse<BucketStatus>> {
    ApiResponse::new(state.limiter.status(&client.0), req_id.0)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::Router;
    use chrono::Utc;
    use pricecomp_core::{Listing, Region, Retriever, RetrieverError};
    use pricecomp_search::{MemoryStore, SearchCache, SearchService, SourceTable};
    use tower::ServiceExt;

    use super::{build_app, AppState};
    use crate::rate_limit::{Clock, ManualClock, RateLimiter};

    pub(crate) struct StubRetriever {
        pub name: &'static str,
        pub listings: Vec<(&'static str, &'static str)>,
    }

    #[async_trait]
    impl Retriever for StubRetriever {
        fn name(&self) -> &str {
            self.name
        }

        async fn search(
            &self,
            _query: &str,
            region: &Region,
        ) -> Result<Vec<Listing>, RetrieverError> {
            Ok(self
                .listings
                .iter()
                .enumerate()
                .map(|(i, (name, price))| Listing {
                    id: format!("{}_{region}_{}", self.name.to_lowercase(), i + 1),
                    name: (*name).to_string(),
                    price: (*price).to_string(),
                    currency: "INR".to_string(),
                    price_value: None,
                    rating: None,
                    reviews: None,
                    source: format!("{} {region}", self.name),
                    url: String::new(),
                    image: String::new(),
                    in_stock: true,
                    scraped_at: Utc::now(),
                    description: None,
                })
                .collect())
        }
    }

    pub(crate) fn stub_sources() -> SourceTable {
        SourceTable::new()
            .global(Arc::new(StubRetriever {
                name: "Alpha",
                listings: vec![("Laptop Stand", "₹1,200"), ("Laptop Sleeve", "₹450")],
            }))
            .regional(
                ["IN"],
                Arc::new(StubRetriever {
                    name: "Beta",
                    listings: vec![("Laptop Bag", "₹900")],
                }),
            )
    }

    pub(crate) async fn test_state(cache_enabled: bool, burst: u32) -> (AppState, Arc<ManualClock>) {
        let cache = if cache_enabled {
            SearchCache::connect(Arc::new(MemoryStore::new(100)), Duration::from_secs(600)).await
        } else {
            SearchCache::Unavailable
        };
        let service = SearchService::new(
            stub_sources(),
            cache,
            Region::parse("IN").unwrap(),
            Duration::from_secs(5),
        );
        let clock = Arc::new(ManualClock::new());
        let clock_dyn: Arc<dyn Clock> = Arc::clone(&clock) as Arc<dyn Clock>;
        let state = AppState {
            service: Arc::new(service),
            limiter: Arc::new(RateLimiter::new(10, burst, clock_dyn)),
            trust_forwarded_for: false,
        };
        (state, clock)
    }

    pub(crate) async fn test_app(cache_enabled: bool, burst: u32) -> (Router, Arc<ManualClock>) {
        let (state, clock) = test_state(cache_enabled, burst).await;
        (build_app(state), clock)
    }

    pub(crate) async fn send(
        app: &Router,
        method: &str,
        uri: &str,
    ) -> (axum::http::StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{send, test_app, test_state};
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_cache_unavailable_maps_to_503() {
        let response = map_cache_error("req-1".into(), &CacheError::Unavailable).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn health_reports_cache_state() {
        let (app, _) = test_app(true, 20).await;
        let (status, body) = send(&app, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "healthy");
        assert_eq!(body["data"]["service"], "pricecomp");
        assert_eq!(body["data"]["cache"], "connected");
        assert!(body["meta"]["request_id"].is_string());

        let (app, _) = test_app(false, 20).await;
        let (_, body) = send(&app, "GET", "/health").await;
        assert_eq!(body["data"]["cache"], "unavailable");
    }

    #[tokio::test]
    async fn request_id_is_echoed() {
        let (app, _) = test_app(false, 20).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("x-request-id").unwrap(),
            "abc-123"
        );
    }

    #[tokio::test]
    async fn requests_beyond_burst_are_rate_limited() {
        let (app, clock) = test_app(false, 2).await;
        assert_eq!(send(&app, "GET", "/health").await.0, StatusCode::OK);
        assert_eq!(send(&app, "GET", "/health").await.0, StatusCode::OK);

        let (status, body) = send(&app, "GET", "/health").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "rate_limited");

        clock.advance(std::time::Duration::from_millis(100));
        assert_eq!(send(&app, "GET", "/health").await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn rate_limit_status_reports_bucket() {
        let (app, _) = test_app(false, 20).await;
        let (status, body) = send(&app, "GET", "/rate-limit/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["client"], "unknown");
        assert_eq!(body["data"]["burst_capacity"], 20);
        assert_eq!(body["data"]["limit_per_second"], 10.0);
        // The status request itself consumed one token.
        assert_eq!(body["data"]["tokens_available"], 19.0);
    }

    async fn get_forwarded(app: &Router, forwarded_for: &str) -> StatusCode {
        app.clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-forwarded-for", forwarded_for)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn spoofed_forwarded_for_does_not_bypass_limit() {
        let (app, _) = test_app(false, 2).await;
        assert_eq!(get_forwarded(&app, "198.51.100.1").await, StatusCode::OK);
        assert_eq!(get_forwarded(&app, "198.51.100.2").await, StatusCode::OK);
        assert_eq!(
            get_forwarded(&app, "198.51.100.3").await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn trusted_forwarded_for_separates_callers() {
        let (mut state, _) = test_state(false, 1).await;
        state.trust_forwarded_for = true;
        let app = build_app(state);
        assert_eq!(get_forwarded(&app, "198.51.100.1").await, StatusCode::OK);
        assert_eq!(
            get_forwarded(&app, "198.51.100.1").await,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(get_forwarded(&app, "198.51.100.2").await, StatusCode::OK);
    }
}
