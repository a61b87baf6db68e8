//! Response cache for single-record fetches
//!
//! Entries hold the last known object and its ETag so a later fetch can be
//! revalidated with `If-None-Match`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Cached object plus its validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedObject {
    pub etag: Option<String>,
    pub object: Value,
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Cache serialization error: {0}")]
    Serialization(String),

    #[error("Cache backend error: {0}")]
    Backend(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Key/value store used by `get_one`
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<CachedObject>>;

    async fn put(&self, key: &str, value: CachedObject, ttl: Duration) -> CacheResult<()>;

    async fn forget(&self, key: &str) -> CacheResult<bool>;
}

/// Cache key for one object of a collection on a connection
pub fn cache_key(base_url: &str, object_endpoint: &str, collection_endpoint: &str) -> String {
    let raw = format!("{}_{}_{}", base_url, object_endpoint, collection_endpoint);
    hex::encode(blake3::hash(raw.as_bytes()).as_bytes())
}

#[derive(Debug)]
struct CacheEntry {
    data: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Entries kept by a cache built with `MemoryResponseCache::new`
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// In-memory backend with LRU eviction
///
/// Expired entries are dropped on read and before any eviction. Once
/// `max_entries` is reached, the least recently used key makes room for a new one.
#[derive(Debug)]
pub struct MemoryResponseCache {
    entries: DashMap<String, CacheEntry>,
    /// Most recently used key first
    lru: Mutex<VecDeque<String>>,
    max_entries: Option<usize>,
    stats: Arc<Mutex<CacheStats>>,
}

impl Default for MemoryResponseCache {
    fn default() -> Self {
        Self::with_max_entries(Some(DEFAULT_MAX_ENTRIES))
    }
}

impl MemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` keeps every entry until it expires
    pub fn with_max_entries(max_entries: Option<usize>) -> Self {
        Self {
            entries: DashMap::new(),
            lru: Mutex::new(VecDeque::new()),
            max_entries,
            stats: Arc::new(Mutex::new(CacheStats::default())),
        }
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every expired entry and return how many were dropped
    pub fn purge_expired(&self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    fn touch(&self, key: &str) {
        let mut lru = self.lru.lock();
        if let Some(position) = lru.iter().position(|k| k == key) {
            lru.remove(position);
        }
        lru.push_front(key.to_string());
    }

    fn remove(&self, key: &str) -> bool {
        let mut lru = self.lru.lock();
        if let Some(position) = lru.iter().position(|k| k == key) {
            lru.remove(position);
        }
        drop(lru);
        self.entries.remove(key).is_some()
    }

    /// Make room for one new key
    fn evict(&self) {
        let Some(max) = self.max_entries else {
            return;
        };
        if self.entries.len() < max {
            return;
        }

        self.purge_expired();
        while self.entries.len() >= max {
            let Some(oldest) = self.lru.lock().pop_back() else {
                break;
            };
            tracing::debug!("Evicting cached response [{}]", oldest);
            self.entries.remove(&oldest);
        }
    }
}

#[async_trait]
impl ResponseCache for MemoryResponseCache {
    async fn get(&self, key: &str) -> CacheResult<Option<CachedObject>> {
        let data = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.data.clone()),
            Some(_) => None,
            None => None,
        };

        let Some(data) = data else {
            // Drop outside of the read guard
            if self.entries.get(key).map_or(false, |entry| entry.is_expired()) {
                self.remove(key);
            }
            self.stats.lock().misses += 1;
            return Ok(None);
        };

        self.touch(key);
        self.stats.lock().hits += 1;
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    async fn put(&self, key: &str, value: CachedObject, ttl: Duration) -> CacheResult<()> {
        let data = serde_json::to_vec(&value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        if !self.entries.contains_key(key) {
            self.evict();
        }

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                expires_at: Instant::now() + ttl,
            },
        );
        self.touch(key);
        Ok(())
    }

    async fn forget(&self, key: &str) -> CacheResult<bool> {
        Ok(self.remove(key))
    }
}
