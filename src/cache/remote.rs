//! Remote (Redis) cache tier.
//!
//! # Responsibilities
//! - Connect to the configured Redis logical database
//! - Store bincode-encoded [`CacheItem`]s with the tier's own TTL
//! - Flush the whole logical database on clear
//!
//! # Design Decisions
//! - "Not found" is its own error variant so callers can tell it apart from
//!   a transport failure
//! - The tier never retries; the facade decides what a failure means

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::cache::item::CacheItem;
use crate::config::RedisConfig;

/// Failure of a remote tier operation.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("key not found")]
    NotFound,

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("remote operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid redis address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
}

impl RemoteError {
    /// True for a plain miss, as opposed to a failure worth surfacing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound)
    }
}

/// A shared cache tier reached over the network.
#[async_trait]
pub trait RemoteTier: Send + Sync {
    /// Fetch the item stored under `key`.
    async fn get(&self, key: &str) -> Result<CacheItem, RemoteError>;

    /// Store `item` under `key`, replacing any previous value.
    async fn set(&self, key: &str, item: &CacheItem) -> Result<(), RemoteError>;

    /// Remove every key in the tier's keyspace.
    async fn remove_all(&self) -> Result<(), RemoteError>;
}

/// Redis-backed [`RemoteTier`].
#[derive(Clone)]
pub struct RedisTier {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisTier {
    /// Connect to Redis and verify the connection with a `PING`.
    pub async fn connect(config: &RedisConfig, ttl: Duration) -> Result<Self, RemoteError> {
        let url = connection_url(config)?;
        let client = redis::Client::open(url.as_str())?;
        let mut conn = ConnectionManager::new(client).await?;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        tracing::info!(
            address = %config.address,
            db = config.db,
            reply = %pong,
            "Connected to remote cache"
        );

        Ok(Self { conn, ttl })
    }
}

#[async_trait]
impl RemoteTier for RedisTier {
    async fn get(&self, key: &str) -> Result<CacheItem, RemoteError> {
        let mut conn = self.conn.clone();
        let raw: Option<Vec<u8>> = conn.get(key).await?;
        let raw = raw.ok_or(RemoteError::NotFound)?;
        Ok(CacheItem::decode(&raw)?)
    }

    async fn set(&self, key: &str, item: &CacheItem) -> Result<(), RemoteError> {
        let encoded = item.encode()?;
        let millis = u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.conn.clone();
        let () = conn.pset_ex(key, encoded, millis).await?;
        Ok(())
    }

    async fn remove_all(&self) -> Result<(), RemoteError> {
        let mut conn = self.conn.clone();
        let () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Build a `redis://` URL from the tier config, percent-encoding credentials.
fn connection_url(config: &RedisConfig) -> Result<url::Url, RemoteError> {
    let invalid = |reason: String| RemoteError::InvalidAddress {
        address: config.address.clone(),
        reason,
    };

    let mut url = url::Url::parse(&format!("redis://{}/{}", config.address, config.db))
        .map_err(|e| invalid(e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    if !config.username.is_empty() {
        url.set_username(&config.username)
            .map_err(|_| invalid("cannot carry a username".to_string()))?;
    }
    if !config.password.is_empty() {
        url.set_password(Some(&config.password))
            .map_err(|_| invalid("cannot carry a password".to_string()))?;
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_config(address: &str) -> RedisConfig {
        RedisConfig {
            address: address.to_string(),
            ..RedisConfig::default()
        }
    }

    #[test]
    fn test_connection_url_plain() {
        let url = connection_url(&redis_config("localhost:6379")).unwrap();
        assert_eq!(url.as_str(), "redis://localhost:6379/0");
    }

    #[test]
    fn test_connection_url_with_credentials() {
        let config = RedisConfig {
            address: "cache.internal:6380".to_string(),
            db: 3,
            username: "proxy".to_string(),
            password: "p@ss word".to_string(),
        };
        let url = connection_url(&config).unwrap();
        assert_eq!(url.username(), "proxy");
        assert_eq!(url.password(), Some("p%40ss%20word"));
        assert_eq!(url.path(), "/3");
        assert_eq!(url.port(), Some(6380));
    }

    #[test]
    fn test_connection_url_rejects_garbage() {
        let err = connection_url(&redis_config("::::")).unwrap_err();
        assert!(matches!(err, RemoteError::InvalidAddress { .. }));
    }

    #[test]
    fn test_not_found_is_distinct() {
        assert!(RemoteError::NotFound.is_not_found());
        assert!(!RemoteError::Timeout(Duration::from_secs(1)).is_not_found());
    }
}
