use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, SERVICE_NAME};

const FEATURES: [&str; 7] = [
    "multi-source search",
    "price comparison",
    "response caching",
    "filtering",
    "sorting",
    "pagination",
    "per-client rate limiting",
];

const ENDPOINTS: [(&str, &str, &str); 7] = [
    ("GET", "/search", "search products with filtering, sorting and pagination"),
    ("GET", "/health", "service health and cache state"),
    ("GET", "/cache/stats", "cache backend statistics"),
    ("GET", "/cache/debug", "cached search keys with remaining TTL"),
    ("DELETE", "/cache/flush", "remove every cached search"),
    ("GET", "/rate-limit/status", "caller's rate-limit bucket"),
    ("GET", "/api/info", "this document"),
];

#[derive(Debug, Serialize)]
pub(super) struct Endpoint {
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct SourceInfo {
    name: String,
    /// `None` for sources consulted in every region.
    regions: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub(super) struct ApiInfo {
    name: &'static str,
    version: &'static str,
    description: &'static str,
    default_region: String,
    features: &'static [&'static str],
    endpoints: Vec<Endpoint>,
    sources: Vec<SourceInfo>,
}

pub(super) async fn api_info(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ApiInfo>> {
    let sources = state
        .service
        .sources()
        .describe()
        .into_iter()
        .map(|(name, regions)| SourceInfo {
            name,
            regions: regions.map(|rs| rs.iter().map(ToString::to_string).collect()),
        })
        .collect();

    let endpoints = ENDPOINTS
        .iter()
        .map(|&(method, path, description)| Endpoint {
            method,
            path,
            description,
        })
        .collect();

    ApiResponse::new(
        ApiInfo {
            name: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            description: "compares product prices across multiple storefronts",
            default_region: state.service.default_region().to_string(),
            features: &FEATURES,
            endpoints,
            sources,
        },
        req_id.0,
    )
}
