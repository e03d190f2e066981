//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4)
//! - Derive the cache key from method, host and path
//! - Prepare inbound headers for forwarding to the origin
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Hop-by-hop headers and `Host` are never forwarded

use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Request};
use tower_http::request_id::{MakeRequestId, RequestId};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Headers that describe a single connection and must not be relayed.
pub const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Generates `x-request-id` values for [`tower_http::request_id::SetRequestIdLayer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Host the client addressed: the `Host` header, else the URI authority.
pub fn request_host(parts: &Parts) -> String {
    parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| parts.uri.authority().map(|a| a.as_str()))
        .unwrap_or_default()
        .to_string()
}

/// Cache key for a request: method + host + path.
///
/// The query string only takes part when `include_query` is set; otherwise
/// requests that differ only by query share an entry.
pub fn cache_key(parts: &Parts, include_query: bool) -> String {
    let mut key = format!(
        "{}{}{}",
        parts.method,
        request_host(parts),
        parts.uri.path()
    );
    if include_query {
        if let Some(query) = parts.uri.query() {
            key.push('?');
            key.push_str(query);
        }
    }
    key
}

/// Whether the request body is relayed to the origin.
///
/// Safe methods (GET, HEAD, OPTIONS, TRACE) are sent without a body.
pub fn carries_body(method: &Method) -> bool {
    !method.is_safe()
}

/// True for headers that must not cross the proxy, including any named in
/// the `Connection` header of `headers`.
pub fn is_hop_by_hop(name: &HeaderName, headers: &HeaderMap) -> bool {
    if HOP_BY_HOP.contains(name) {
        return true;
    }
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| name.as_str().eq_ignore_ascii_case(token.trim()))
}

/// Copy of the inbound headers suitable for the origin request.
///
/// `Host` is dropped so the origin sees its own authority, and
/// `Content-Length` is recomputed by the client from the relayed body.
pub fn forward_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if *name == header::HOST || *name == header::CONTENT_LENGTH || is_hop_by_hop(name, inbound) {
            continue;
        }
        outbound.append(name.clone(), value.clone());
    }
    outbound
}
