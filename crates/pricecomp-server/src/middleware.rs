use std::{net::SocketAddr, time::Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::api::{ApiError, AppState};
use crate::rate_limit::Decision;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Caller identity used for rate limiting, stored as a request extension.
#[derive(Debug, Clone)]
pub struct ClientId(pub String);

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
///
/// Method, path, status and latency are logged once the response is ready.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let mut res = next.run(req).await;

    tracing::info!(
        request_id = %id,
        %method,
        %path,
        status = res.status().as_u16(),
        latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "request completed"
    );

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Identifies the caller: the first `x-forwarded-for` hop when
/// `trust_forwarded_for` is set, then the peer address, then `"unknown"`.
pub fn client_id(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> String {
    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
    };

    trust_forwarded_for
        .then(forwarded)
        .flatten()
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware enforcing the per-client token bucket.
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_id(req.headers(), peer, state.trust_forwarded_for);

    if let Decision::Limited { retry_after } = state.limiter.check(&client) {
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map(|r| r.0.clone())
            .unwrap_or_default();
        tracing::warn!(%client, %request_id, "rate limit exceeded");

        let mut res = ApiError::new(request_id, "rate_limited", "rate limit exceeded").into_response();
        let secs = retry_after.as_secs_f64().ceil().max(1.0);
        if let Ok(val) = HeaderValue::from_str(&format!("{secs:.0}")) {
            res.headers_mut().insert(RETRY_AFTER, val);
        }
        return res;
    }

    req.extensions_mut().insert(ClientId(client));
    next.run(req).await
}
