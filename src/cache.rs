// src/cache.rs

//! Process-wide freshness cache.
//!
//! A TTL-based key/value store for computed result sets (recent-feed sets,
//! per-keyword search sets, analytics rollups). Values are held as
//! `serde_json::Value` so any serializable shape fits; typed access goes
//! through the generic `set`/`get` pair.
//!
//! Expiry is passive: entries are checked (and pruned) at read time, so no
//! background sweep is needed for correctness. A `get` returns `None` both
//! on miss and on expiry; callers cannot distinguish the two.
//!
//! This is the only in-process mutable shared state in the core. All
//! mutation serializes through one `RwLock`; concurrent readers of live
//! entries proceed in parallel.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// Default TTL applied when a call site does not override it.
pub const DEFAULT_TTL_SECS: u64 = 900;

/// A cached value with its expiration instant.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(value: Value, ttl_secs: u64) -> Self {
        Self {
            value,
            expires_at: Utc::now() + Duration::seconds(ttl_secs as i64),
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub keys: usize,
}

/// TTL key/value cache, constructor-injected rather than global so tests
/// can run against isolated instances.
pub struct FreshnessCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    default_ttl_secs: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FreshnessCache {
    /// Create a cache with the given default TTL in seconds.
    pub fn new(default_ttl_secs: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl_secs,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Store a value under `key`; `ttl_secs` falls back to the default TTL.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: Option<u64>) -> Result<()> {
        let ttl = ttl_secs.unwrap_or(self.default_ttl_secs);
        let entry = CacheEntry::new(serde_json::to_value(value)?, ttl);

        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(key.to_string(), entry);
        log::debug!("Cached: {} (TTL: {}s)", key, ttl);
        Ok(())
    }

    /// Retrieve a value, or `None` on miss, expiry, or a shape mismatch.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        {
            let entries = self.entries.read().expect("cache lock poisoned");
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => {
                    let value = entry.value.clone();
                    drop(entries);
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    log::debug!("Cache hit: {}", key);
                    return serde_json::from_value(value).ok();
                }
                Some(_) => {} // expired, prune below
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    log::debug!("Cache miss: {}", key);
                    return None;
                }
            }
        }

        // Expired: prune under the write lock, re-checking in case a
        // concurrent set refreshed the entry in between.
        let mut entries = self.entries.write().expect("cache lock poisoned");
        if entries.get(key).is_some_and(CacheEntry::is_expired) {
            entries.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!("Cache expired: {}", key);
        None
    }

    /// Remove a single key. Returns whether an entry was present.
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        let removed = entries.remove(key).is_some();
        if removed {
            log::debug!("Cache deleted: {}", key);
        }
        removed
    }

    /// Drop every entry.
    pub fn flush_all(&self) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.clear();
        log::info!("Cache fully cleared");
    }

    /// Counter snapshot for diagnostics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().expect("cache lock poisoned");
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            keys: entries.len(),
        }
    }
}

impl Default for FreshnessCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}
