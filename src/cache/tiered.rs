//! Two-tier cache facade.
//!
//! Reads go local first and fall through to the remote tier; writes land
//! locally before returning and reach the remote tier on a detached task.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::item::CacheItem;
use crate::cache::local::LocalCache;
use crate::cache::remote::{RedisTier, RemoteError, RemoteTier};
use crate::cache::CacheError;
use crate::config::CacheConfig;
use crate::observability::metrics;

/// Default deadline for a detached remote write.
pub const DEFAULT_REMOTE_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// The cache used by the proxy handler.
pub struct TieredCache {
    local: LocalCache,
    remote: Option<Arc<dyn RemoteTier>>,
    ttl: Duration,
    remote_write_timeout: Duration,
}

impl TieredCache {
    /// Build a cache from config, connecting to Redis when an address is set.
    pub async fn connect(config: &CacheConfig) -> Result<Self, CacheError> {
        let remote: Option<Arc<dyn RemoteTier>> = if config.redis.is_enabled() {
            Some(Arc::new(RedisTier::connect(&config.redis, config.ttl).await?))
        } else {
            tracing::info!("No remote cache address configured, running local tier only");
            None
        };
        Ok(Self::new(config, remote))
    }

    /// Build a cache around an already constructed remote tier.
    pub fn new(config: &CacheConfig, remote: Option<Arc<dyn RemoteTier>>) -> Self {
        Self {
            local: LocalCache::new(config.capacity),
            remote,
            ttl: config.ttl,
            remote_write_timeout: DEFAULT_REMOTE_WRITE_TIMEOUT,
        }
    }

    /// Override the deadline applied to detached remote writes.
    pub fn with_remote_write_timeout(mut self, timeout: Duration) -> Self {
        self.remote_write_timeout = timeout;
        self
    }

    /// Look up `key`, local tier first.
    ///
    /// A remote hit is copied into the local tier so the next lookup stays
    /// in-process. Any remote failure counts as a miss.
    pub async fn get(&self, key: &str) -> Option<Arc<CacheItem>> {
        if let Some(item) = self.local.get(key) {
            metrics::record_cache_lookup("local", true);
            return Some(item);
        }
        metrics::record_cache_lookup("local", false);

        let remote = self.remote.as_ref()?;
        tracing::debug!(key = %key, "Looking up remote cache");
        match remote.get(key).await {
            Ok(item) if !item.is_expired() => {
                metrics::record_cache_lookup("remote", true);
                let item = Arc::new(item);
                self.local.set(key, item.clone());
                metrics::record_cache_size(self.local.len());
                Some(item)
            }
            Ok(_) => {
                tracing::debug!(key = %key, "Remote cache entry already expired");
                metrics::record_cache_lookup("remote", false);
                None
            }
            Err(e) => {
                log_remote_error("get", key, &e);
                metrics::record_cache_lookup("remote", false);
                None
            }
        }
    }

    /// Store `item` under `key`.
    ///
    /// The local write is visible as soon as this returns. The remote write
    /// runs on its own task with its own deadline; it is not awaited and is
    /// not cancelled if the calling request goes away.
    pub fn set(&self, key: &str, item: CacheItem) {
        let item = Arc::new(item);
        self.local.set(key, item.clone());
        metrics::record_cache_size(self.local.len());

        if let Some(remote) = &self.remote {
            let remote = remote.clone();
            let key = key.to_string();
            let timeout = self.remote_write_timeout;
            tokio::spawn(async move {
                let result = match tokio::time::timeout(timeout, remote.set(&key, &item)).await {
                    Ok(result) => result,
                    Err(_) => Err(RemoteError::Timeout(timeout)),
                };
                if let Err(e) = result {
                    log_remote_error("set", &key, &e);
                }
            });
        }
    }

    /// TTL applied to newly created items.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Clear both tiers. Only the remote tier can fail.
    pub async fn remove_all(&self) -> Result<(), CacheError> {
        self.local.remove_all();
        metrics::record_cache_size(0);
        if let Some(remote) = &self.remote {
            remote.remove_all().await?;
        }
        Ok(())
    }

    /// Number of entries in the local tier.
    pub fn len(&self) -> usize {
        self.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }
}

fn log_remote_error(op: &'static str, key: &str, error: &RemoteError) {
    if error.is_not_found() {
        tracing::debug!(key = %key, "Remote cache miss");
        return;
    }
    metrics::record_remote_error(op);
    tracing::warn!(op, key = %key, error = %error, "Remote cache operation failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::item::HeaderList;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory remote tier that counts round trips.
    #[derive(Default)]
    struct FakeRemote {
        store: Mutex<HashMap<String, Vec<u8>>>,
        gets: AtomicUsize,
        sets: AtomicUsize,
        fail: bool,
        write_delay: Option<Duration>,
    }

    #[async_trait]
    impl RemoteTier for FakeRemote {
        async fn get(&self, key: &str) -> Result<CacheItem, RemoteError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RemoteError::Timeout(Duration::from_millis(1)));
            }
            let raw = self.store.lock().unwrap().get(key).cloned();
            let raw = raw.ok_or(RemoteError::NotFound)?;
            Ok(CacheItem::decode(&raw)?)
        }

        async fn set(&self, key: &str, item: &CacheItem) -> Result<(), RemoteError> {
            if let Some(delay) = self.write_delay {
                tokio::time::sleep(delay).await;
            }
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.store
                .lock()
                .unwrap()
                .insert(key.to_string(), item.encode()?);
            Ok(())
        }

        async fn remove_all(&self) -> Result<(), RemoteError> {
            if self.fail {
                return Err(RemoteError::Timeout(Duration::from_millis(1)));
            }
            self.store.lock().unwrap().clear();
            Ok(())
        }
    }

    fn config(capacity: usize) -> CacheConfig {
        CacheConfig {
            capacity,
            ttl: Duration::from_secs(60),
            ..CacheConfig::default()
        }
    }

    fn item(key: &str) -> CacheItem {
        CacheItem::new(key, 200, HeaderList::new(), Bytes::from(key.to_string()), Duration::from_secs(60))
    }

    async fn wait_for_sets(remote: &FakeRemote, n: usize) {
        for _ in 0..100 {
            if remote.sets.load(Ordering::SeqCst) >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("remote writes did not land");
    }

    #[tokio::test]
    async fn test_local_only() {
        let cache = TieredCache::new(&config(2), None);
        assert!(!cache.has_remote());
        assert!(cache.get("a").await.is_none());

        cache.set("a", item("a"));
        assert_eq!(cache.get("a").await.unwrap().body, Bytes::from("a"));
        assert_eq!(cache.ttl(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_set_writes_through() {
        let remote = Arc::new(FakeRemote::default());
        let cache = TieredCache::new(&config(2), Some(remote.clone()));

        cache.set("a", item("a"));
        assert!(cache.get("a").await.is_some());
        wait_for_sets(&remote, 1).await;
        assert!(remote.store.lock().unwrap().contains_key("a"));
        assert_eq!(remote.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remote_backfill() {
        let remote = Arc::new(FakeRemote::default());
        let cache = TieredCache::new(&config(1), Some(remote.clone()));

        cache.set("a", item("a"));
        cache.set("b", item("b"));
        wait_for_sets(&remote, 2).await;
        assert_eq!(cache.len(), 1);

        // "a" was evicted locally but is still remote.
        let got = cache.get("a").await.unwrap();
        assert_eq!(got.body, Bytes::from("a"));
        assert_eq!(remote.gets.load(Ordering::SeqCst), 1);

        assert!(cache.get("a").await.is_some());
        assert_eq!(remote.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_is_a_miss() {
        let remote = Arc::new(FakeRemote {
            fail: true,
            ..FakeRemote::default()
        });
        let cache = TieredCache::new(&config(2), Some(remote.clone()));

        assert!(cache.get("a").await.is_none());
        assert_eq!(remote.gets.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_expired_remote_item_is_a_miss() {
        let remote = Arc::new(FakeRemote::default());
        let mut stale = item("a");
        stale.expires_at = std::time::SystemTime::now() - Duration::from_secs(1);
        remote
            .store
            .lock()
            .unwrap()
            .insert("a".to_string(), stale.encode().unwrap());

        let cache = TieredCache::new(&config(2), Some(remote.clone()));
        assert!(cache.get("a").await.is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_slow_remote_write_does_not_block() {
        let remote = Arc::new(FakeRemote {
            write_delay: Some(Duration::from_secs(30)),
            ..FakeRemote::default()
        });
        let cache = TieredCache::new(&config(2), Some(remote.clone()))
            .with_remote_write_timeout(Duration::from_millis(20));

        let started = std::time::Instant::now();
        cache.set("a", item("a"));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(cache.get("a").await.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(remote.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remove_all_clears_both_tiers() {
        let remote = Arc::new(FakeRemote::default());
        let cache = TieredCache::new(&config(4), Some(remote.clone()));
        cache.set("a", item("a"));
        cache.set("b", item("b"));
        wait_for_sets(&remote, 2).await;

        cache.remove_all().await.unwrap();
        assert!(cache.is_empty());
        assert!(remote.store.lock().unwrap().is_empty());
        assert!(cache.get("a").await.is_none());
        assert!(cache.get("b").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_all_reports_remote_error() {
        let remote = Arc::new(FakeRemote {
            fail: true,
            ..FakeRemote::default()
        });
        let cache = TieredCache::new(&config(2), Some(remote));
        cache.set("a", item("a"));

        assert!(cache.remove_all().await.is_err());
        assert!(cache.is_empty());
    }
}
