//! Configuration loading: built-in defaults, then the TOML file, then the
//! environment.
//!
//! Each layer is parsed into a [`ConfigOverlay`] whose fields are all
//! optional. An overlay only replaces a value it actually carries, and zero
//! or empty values never replace anything, so `CACHE_CAPACITY=0` leaves the
//! file (or default) capacity in place.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_CACHE_CAPACITY: &str = "CACHE_CAPACITY";
pub const ENV_CACHE_TTL: &str = "CACHE_TTL";
pub const ENV_REDIS_ADDR: &str = "REDIS_ADDR";
pub const ENV_REDIS_USERNAME: &str = "REDIS_USERNAME";
pub const ENV_REDIS_PASSWORD: &str = "REDIS_PASSWORD";
pub const ENV_REDIS_DB: &str = "REDIS_DB";
pub const ENV_LOG_LEVEL: &str = "PROXY_LOG_LEVEL";
pub const ENV_MAX_BODY_BYTES: &str = "PROXY_MAX_BODY_BYTES";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A partial configuration from a single source.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverlay {
    pub cache: CacheOverlay,
    pub timeouts: TimeoutOverlay,
    pub limits: LimitsOverlay,
    pub observability: ObservabilityOverlay,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheOverlay {
    pub capacity: Option<usize>,
    /// Human-readable duration such as `"10m"` or `"1h30m"`.
    pub ttl: Option<String>,
    pub key_includes_query: Option<bool>,
    pub redis: RedisOverlay,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedisOverlay {
    pub address: Option<String>,
    pub db: Option<u32>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutOverlay {
    pub connect_secs: Option<u64>,
    pub request_secs: Option<u64>,
    pub remote_write_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsOverlay {
    pub max_body_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityOverlay {
    pub log_level: Option<String>,
    pub metrics_enabled: Option<bool>,
    pub metrics_address: Option<String>,
}

impl ConfigOverlay {
    /// Parse an overlay from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read an overlay from a TOML file. A missing file yields `None`.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Config file not found, using defaults");
                Ok(None)
            }
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Build an overlay from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build an overlay from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut overlay = Self::default();

        if let Some(v) = lookup(ENV_CACHE_CAPACITY) {
            overlay.cache.capacity = Some(parse_number(ENV_CACHE_CAPACITY, &v)?);
        }
        overlay.cache.ttl = lookup(ENV_CACHE_TTL);
        overlay.cache.redis.address = lookup(ENV_REDIS_ADDR);
        overlay.cache.redis.username = lookup(ENV_REDIS_USERNAME);
        overlay.cache.redis.password = lookup(ENV_REDIS_PASSWORD);
        if let Some(v) = lookup(ENV_REDIS_DB) {
            overlay.cache.redis.db = Some(parse_number(ENV_REDIS_DB, &v)?);
        }
        if let Some(v) = lookup(ENV_MAX_BODY_BYTES) {
            overlay.limits.max_body_bytes = Some(parse_number(ENV_MAX_BODY_BYTES, &v)?);
        }
        overlay.observability.log_level = lookup(ENV_LOG_LEVEL);

        Ok(overlay)
    }

    /// Apply every non-zero, non-empty value of this overlay onto `config`.
    pub fn apply(&self, config: &mut ProxyConfig) -> Result<(), ConfigError> {
        let cache = &mut config.cache;
        if let Some(capacity) = self.cache.capacity.filter(|c| *c > 0) {
            cache.capacity = capacity;
        }
        if let Some(raw) = self.cache.ttl.as_deref().filter(|r| !r.trim().is_empty()) {
            let ttl = parse_duration("cache.ttl", raw)?;
            if !ttl.is_zero() {
                cache.ttl = ttl;
            }
        }
        if let Some(flag) = self.cache.key_includes_query {
            cache.key_includes_query = flag;
        }

        let redis = &self.cache.redis;
        set_string(&mut cache.redis.address, &redis.address);
        set_string(&mut cache.redis.username, &redis.username);
        set_string(&mut cache.redis.password, &redis.password);
        if let Some(db) = redis.db.filter(|db| *db > 0) {
            cache.redis.db = db;
        }

        let timeouts = &mut config.timeouts;
        set_secs(&mut timeouts.connect_secs, self.timeouts.connect_secs);
        set_secs(&mut timeouts.request_secs, self.timeouts.request_secs);
        set_secs(&mut timeouts.remote_write_secs, self.timeouts.remote_write_secs);

        if let Some(max) = self.limits.max_body_bytes.filter(|m| *m > 0) {
            config.limits.max_body_bytes = max;
        }

        let observability = &mut config.observability;
        set_string(&mut observability.log_level, &self.observability.log_level);
        set_string(&mut observability.metrics_address, &self.observability.metrics_address);
        if let Some(flag) = self.observability.metrics_enabled {
            observability.metrics_enabled = flag;
        }

        Ok(())
    }
}

fn set_string(target: &mut String, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
        *target = v.to_string();
    }
}

fn set_secs(target: &mut u64, value: Option<u64>) {
    if let Some(v) = value.filter(|v| *v > 0) {
        *target = v;
    }
}

fn parse_number<T>(field: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        field,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a human duration (`"90s"`, `"10m"`, `"1h30m"`). A bare `"0"` is zero.
pub fn parse_duration(field: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let raw = raw.trim();
    if raw == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(raw).map_err(|e| ConfigError::InvalidValue {
        field,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve the full configuration: defaults, then `path` (if present), then
/// the process environment, then validation.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let env = ConfigOverlay::from_env()?;
    resolve(ConfigOverlay::from_file(path)?, env)
}

/// Layer `file` and `env` over the defaults and validate the result.
pub fn resolve(file: Option<ConfigOverlay>, env: ConfigOverlay) -> Result<ProxyConfig, ConfigError> {
    let mut config = ProxyConfig::default();
    if let Some(file) = file {
        file.apply(&mut config)?;
    }
    env.apply(&mut config)?;

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
