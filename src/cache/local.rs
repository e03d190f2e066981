//! In-process LRU cache with lazy TTL expiry.
//!
//! # Layout
//! ```text
//! index: HashMap<key, handle>
//! nodes: [ n0 | n1 | n2 | ... ]   arena, never larger than capacity
//!
//! head ──▶ most recent ◀──▶ ... ◀──▶ least recent ◀── tail
//! ```
//!
//! Nodes link to each other by arena handle rather than by pointer. Slots
//! freed by expiry go on a free list and are reused before the arena grows.
//!
//! # Locking
//! A lookup for an absent key only takes the read lock. A hit always takes
//! the write lock: promoting a node (or dropping an expired one) reorders
//! the recency list even though callers see `get` as a read.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use crate::cache::item::CacheItem;

type Handle = usize;

struct Node {
    key: String,
    /// `None` while the slot sits on the free list.
    item: Option<Arc<CacheItem>>,
    prev: Option<Handle>,
    next: Option<Handle>,
}

struct Lru {
    index: HashMap<String, Handle>,
    nodes: Vec<Node>,
    free: Vec<Handle>,
    head: Option<Handle>,
    tail: Option<Handle>,
    capacity: usize,
}

impl Lru {
    fn new(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            capacity,
        }
    }

    fn unlink(&mut self, h: Handle) {
        let (prev, next) = (self.nodes[h].prev, self.nodes[h].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        self.nodes[h].prev = None;
        self.nodes[h].next = None;
    }

    fn push_front(&mut self, h: Handle) {
        self.nodes[h].prev = None;
        self.nodes[h].next = self.head;
        if let Some(old) = self.head {
            self.nodes[old].prev = Some(h);
        }
        self.head = Some(h);
        if self.tail.is_none() {
            self.tail = Some(h);
        }
    }

    fn promote(&mut self, h: Handle) {
        if self.head != Some(h) {
            self.unlink(h);
            self.push_front(h);
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(h) = self.index.remove(key) {
            self.unlink(h);
            let node = &mut self.nodes[h];
            node.item = None;
            node.key.clear();
            self.free.push(h);
        }
    }

    fn get(&mut self, key: &str, now: SystemTime) -> Option<Arc<CacheItem>> {
        let h = *self.index.get(key)?;
        let item = self.nodes[h].item.clone()?;
        if item.is_expired_at(now) {
            self.remove(key);
            tracing::debug!(key = %key, "Local cache entry expired");
            return None;
        }
        self.promote(h);
        Some(item)
    }

    /// Returns the key evicted to make room, if any.
    fn set(&mut self, key: String, item: Arc<CacheItem>) -> Option<String> {
        if let Some(&h) = self.index.get(&key) {
            self.nodes[h].item = Some(item);
            self.promote(h);
            return None;
        }

        let mut evicted = None;
        let h = if self.index.len() >= self.capacity {
            // Reuse the least-recently-used slot for the new entry.
            let victim = self.tail?;
            self.unlink(victim);
            let old_key = std::mem::take(&mut self.nodes[victim].key);
            self.index.remove(&old_key);
            evicted = Some(old_key);
            victim
        } else if let Some(h) = self.free.pop() {
            h
        } else {
            self.nodes.push(Node {
                key: String::new(),
                item: None,
                prev: None,
                next: None,
            });
            self.nodes.len() - 1
        };

        self.nodes[h].key = key.clone();
        self.nodes[h].item = Some(item);
        self.push_front(h);
        self.index.insert(key, h);
        evicted
    }

    fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    #[cfg(test)]
    fn keys_by_recency(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;
        while let Some(h) = cursor {
            keys.push(self.nodes[h].key.clone());
            cursor = self.nodes[h].next;
        }
        keys
    }
}

/// Bounded in-process cache tier.
pub struct LocalCache {
    inner: RwLock<Lru>,
}

impl LocalCache {
    /// Create an empty cache holding at most `capacity` entries
    /// (clamped to at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Lru::new(capacity.max(1))),
        }
    }

    /// Look up a live entry and mark it most recently used.
    ///
    /// Expired entries are dropped on the spot and reported as absent.
    pub fn get(&self, key: &str) -> Option<Arc<CacheItem>> {
        {
            let lru = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if !lru.index.contains_key(key) {
                return None;
            }
        }

        // The key may have been evicted or cleared since the read lock dropped.
        let mut lru = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        lru.get(key, SystemTime::now())
    }

    /// Insert or replace `key`, evicting the least recently used entry when
    /// the cache is full.
    pub fn set(&self, key: impl Into<String>, item: Arc<CacheItem>) {
        let key = key.into();
        let mut lru = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(evicted) = lru.set(key, item) {
            tracing::debug!(key = %evicted, "Evicted least recently used entry");
        }
    }

    /// Drop every entry.
    pub fn remove_all(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .index
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .capacity
    }

    #[cfg(test)]
    fn keys_by_recency(&self) -> Vec<String> {
        self.inner.read().unwrap().keys_by_recency()
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        let lru = self.inner.read().unwrap();
        let keys = lru.keys_by_recency();
        assert_eq!(keys.len(), lru.index.len(), "index and list disagree");
        assert!(keys.len() <= lru.capacity, "over capacity");
        for (key, &h) in &lru.index {
            assert_eq!(&lru.nodes[h].key, key, "node key mismatch");
            assert!(lru.nodes[h].item.is_some());
        }
    }
}
