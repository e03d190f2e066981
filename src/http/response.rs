//! Response handling and transformation.
//!
//! # Responsibilities
//! - Snapshot origin response headers for caching
//! - Turn a cached item into a client response
//! - Mark every proxied response with its cache outcome
//!
//! # Design Decisions
//! - Bodies are fully buffered, never streamed
//! - Hop-by-hop headers are stripped before an origin response is cached
//! - Repeated headers are appended one occurrence at a time, never merged

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;

use crate::cache::{CacheItem, HeaderList};
use crate::http::request::is_hop_by_hop;

/// Response header reporting whether the cache answered.
pub const X_CACHE: &str = "x-cache";

/// Outcome of the cache lookup for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
        }
    }
}

/// Origin headers worth storing: everything but hop-by-hop headers.
pub fn cacheable_headers(origin: &HeaderMap) -> HeaderList {
    let mut list = HeaderList::new();
    for (name, value) in origin {
        if is_hop_by_hop(name, origin) {
            continue;
        }
        list.append(name.as_str(), value.as_bytes().to_vec());
    }
    list
}

/// Build the client response for `item`, tagged with `status`.
pub fn from_item(item: &CacheItem, status: CacheStatus) -> Response {
    let mut response = Response::new(Body::from(item.body.clone()));
    *response.status_mut() = StatusCode::from_u16(item.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let headers = response.headers_mut();
    item.headers.append_to(headers);
    headers.append(X_CACHE, HeaderValue::from_static(status.as_str()));
    response
}
