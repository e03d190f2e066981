//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (the loader handles syntax)
//! - Validate value ranges (capacity and timeouts > 0)
//! - Check addresses are usable before anything tries to connect
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.cache.capacity == 0 {
        errors.push(ValidationError::new("cache.capacity", "must be greater than zero"));
    }
    if config.cache.ttl.is_zero() {
        errors.push(ValidationError::new("cache.ttl", "must be greater than zero"));
    }

    let redis = &config.cache.redis;
    if redis.is_enabled() {
        if let Err(message) = check_host_port(&redis.address) {
            errors.push(ValidationError::new("cache.redis.address", message));
        }
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.connect_secs", timeouts.connect_secs),
        ("timeouts.request_secs", timeouts.request_secs),
        ("timeouts.remote_write_secs", timeouts.remote_write_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than zero"));
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", observability.log_level),
        ));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_host_port(address: &str) -> Result<(), String> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| format!("'{}' is not host:port", address))?;
    if host.is_empty() {
        return Err(format!("'{}' has no host", address));
    }
    port.parse::<u16>()
        .map(|_| ())
        .map_err(|_| format!("'{}' has an invalid port", address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.cache.capacity = 0;
        config.cache.ttl = Duration::ZERO;
        config.timeouts.request_secs = 0;
        config.limits.max_body_bytes = 0;
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "cache.capacity",
                "cache.ttl",
                "timeouts.request_secs",
                "limits.max_body_bytes",
                "observability.log_level"
            ]
        );
    }

    #[test]
    fn test_redis_address() {
        let mut config = ProxyConfig::default();
        config.cache.redis.address = "localhost:6379".into();
        assert!(validate_config(&config).is_ok());

        for bad in ["localhost", ":6379", "localhost:port"] {
            config.cache.redis.address = bad.into();
            let errors = validate_config(&config).unwrap_err();
            assert_eq!(errors[0].field, "cache.redis.address", "{}", bad);
        }
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
