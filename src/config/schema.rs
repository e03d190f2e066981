//! Configuration schema definitions.
//!
//! These are the resolved, validated values handed to the subsystems. The
//! on-disk and environment layers that produce them live in
//! [`crate::config::loader`].

use std::time::Duration;

/// Root configuration for the caching proxy.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProxyConfig {
    /// Cache tiers.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Inbound request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Cache engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries held by the local tier.
    pub capacity: usize,

    /// Lifetime of a cached response.
    pub ttl: Duration,

    /// Include the query string in the cache key. Off by default, so
    /// requests differing only by query share an entry.
    pub key_includes_query: bool,

    /// Optional remote tier.
    pub redis: RedisConfig,
}

pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
            key_includes_query: false,
            redis: RedisConfig::default(),
        }
    }
}

/// Remote (Redis) tier configuration. An empty address disables the tier.
#[derive(Clone, PartialEq, Default)]
pub struct RedisConfig {
    /// `host:port` of the Redis server.
    pub address: String,

    /// Logical database index.
    pub db: u32,

    pub username: String,

    pub password: String,
}

impl RedisConfig {
    pub fn is_enabled(&self) -> bool {
        !self.address.is_empty()
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("address", &self.address)
            .field("db", &self.db)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .finish()
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeoutConfig {
    /// Origin connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total time for an inbound request, origin round trip included, in seconds.
    pub request_secs: u64,

    /// Deadline for a detached remote cache write in seconds.
    pub remote_write_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            remote_write_secs: 5,
        }
    }
}

pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Inbound request limits.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitsConfig {
    /// Largest request body relayed to the origin; larger bodies get 413.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
