//! Cached response representation.

use std::time::{Duration, SystemTime};

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Ordered header multimap.
///
/// Names keep the order in which they were first seen and every name keeps
/// all of its values, so repeated headers such as `Set-Cookie` survive a
/// trip through either cache tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderList {
    entries: Vec<(String, Vec<Bytes>)>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every header of `map`, including repeated values.
    pub fn from_header_map(map: &HeaderMap) -> Self {
        let mut list = Self::new();
        for name in map.keys() {
            for value in map.get_all(name) {
                list.append(name.as_str(), Bytes::copy_from_slice(value.as_bytes()));
            }
        }
        list
    }

    /// Add a value under `name`, after any values already present.
    pub fn append(&mut self, name: &str, value: impl Into<Bytes>) {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// All values stored for `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> &[Bytes] {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate `(name, value)` pairs, one per header occurrence.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.entries
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v)))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append every occurrence onto `map`. Entries that are not valid HTTP
    /// header names or values are skipped.
    pub fn append_to(&self, map: &mut HeaderMap) {
        for (name, value) in self.iter() {
            let parsed = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_bytes(value),
            );
            match parsed {
                (Ok(name), Ok(value)) => {
                    map.append(name, value);
                }
                _ => tracing::warn!(header = %name, "Skipping invalid cached header"),
            }
        }
    }
}

/// One cached origin response.
///
/// Built once after a successful origin round trip and never mutated; both
/// tiers hand it out as a read-only snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheItem {
    /// Cache key the item was stored under.
    pub key: String,
    /// Origin status code.
    pub status: u16,
    /// Origin response headers.
    pub headers: HeaderList,
    /// Fully buffered origin response body.
    pub body: Bytes,
    /// Absolute expiry; the item is dead once `now >= expires_at`.
    pub expires_at: SystemTime,
}

impl CacheItem {
    /// Build an item that expires `ttl` from now.
    pub fn new(
        key: impl Into<String>,
        status: u16,
        headers: HeaderList,
        body: Bytes,
        ttl: Duration,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            key: key.into(),
            status,
            headers,
            body,
            expires_at: now.checked_add(ttl).unwrap_or(now),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at <= now
    }

    /// Serialize for the remote tier.
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Inverse of [`CacheItem::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
