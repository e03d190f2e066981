//! Caching proxy handler.
//!
//! ```text
//! request → cache key → cache lookup ─ hit ─→ cached response (x-cache: hit)
//!                                    └ miss → origin round trip
//!                                             → buffer body → cache store
//!                                             → origin response (x-cache: miss)
//! ```

use std::error::Error as _;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{request::Parts, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;

use crate::cache::CacheItem;
use crate::http::request::{self, X_REQUEST_ID};
use crate::http::response::{self, CacheStatus};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Failure on the miss path. Reported to the client, never cached.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("failed to read request body: {0}")]
    RequestBody(#[source] axum::Error),

    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("origin request failed: {0}")]
    Origin(#[from] reqwest::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::RequestBody(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Origin(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Serve a request from the cache, or from the origin on a miss.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let request_id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let host = request::request_host(&parts);

    tracing::info!(
        request_id = %request_id,
        method = %parts.method,
        host = %host,
        path = %parts.uri.path(),
        "Incoming request"
    );

    let key = request::cache_key(&parts, state.key_includes_query);

    if let Some(item) = state.cache.get(&key).await {
        tracing::debug!(request_id = %request_id, key = %key, "Cache hit");
        metrics::record_request(parts.method.as_str(), item.status, "hit", start);
        return response::from_item(&item, CacheStatus::Hit);
    }

    match fetch_origin(&state, &parts, body, &key).await {
        Ok(item) => {
            let response = response::from_item(&item, CacheStatus::Miss);
            metrics::record_request(parts.method.as_str(), item.status, "miss", start);
            state.cache.set(&key, item);
            response
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Origin request failed");
            metrics::record_origin_error();
            metrics::record_request(parts.method.as_str(), e.status().as_u16(), "miss", start);
            e.into_response()
        }
    }
}

/// Forward the request to the origin and buffer the full response.
async fn fetch_origin(
    state: &AppState,
    parts: &Parts,
    body: Body,
    key: &str,
) -> Result<CacheItem, ProxyError> {
    let url = state.origin.url_for(&parts.uri);
    tracing::info!(url = %url, "Forwarding request to origin");

    let mut outbound = state
        .client
        .request(parts.method.clone(), &url)
        .headers(request::forward_headers(&parts.headers));
    if request::carries_body(&parts.method) {
        let body = axum::body::to_bytes(body, state.max_body_bytes)
            .await
            .map_err(|e| {
                if exceeds_length_limit(&e) {
                    ProxyError::BodyTooLarge(state.max_body_bytes)
                } else {
                    ProxyError::RequestBody(e)
                }
            })?;
        outbound = outbound.body(body);
    }

    let origin_response = outbound.send().await?;
    let status = origin_response.status().as_u16();
    let headers = response::cacheable_headers(origin_response.headers());
    let body = origin_response.bytes().await?;

    tracing::debug!(url = %url, status, bytes = body.len(), "Origin responded");
    Ok(CacheItem::new(key, status, headers, body, state.cache.ttl()))
}

/// True when a body read failed because a length limit tripped, either our
/// own buffering limit or the one applied by the limit layer.
fn exceeds_length_limit(error: &axum::Error) -> bool {
    let mut source = error.source();
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
