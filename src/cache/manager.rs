//! In-memory store for fetched pages
//!
//! Provides a `ResponseCache` that keeps successful page responses for a fixed
//! time-to-live. Expiry is checked lazily when an entry is read; nothing runs
//! in the background.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use super::CacheKey;
use crate::data::{Item, ResourceType};

/// How long a stored page may be served
pub const CACHE_TTL_MINUTES: i64 = 5;

/// A stored page response
///
/// Entries are immutable once stored; writing the same key again replaces
/// the whole entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Items of the page
    pub payload: Vec<Item>,
    /// Total matching items on the server, across all pages
    pub total_count: u64,
    /// Collection the page was fetched from
    pub resource_type: ResourceType,
    /// When the page was stored
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time
    pub fn new(payload: Vec<Item>, total_count: u64, resource_type: ResourceType) -> Self {
        Self::stored_at(payload, total_count, resource_type, Utc::now())
    }

    /// Creates an entry stamped with an explicit time
    pub fn stored_at(
        payload: Vec<Item>,
        total_count: u64,
        resource_type: ResourceType,
        stored_at: DateTime<Utc>,
    ) -> Self {
        Self {
            payload,
            total_count,
            resource_type,
            stored_at,
        }
    }
}

/// Time-bounded key to response store
///
/// Growth is unbounded: entries only leave the map when they are read after
/// expiring or explicitly invalidated.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    entries: HashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    /// Creates an empty cache with the standard five minute TTL
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(CACHE_TTL_MINUTES))
    }

    /// Creates an empty cache with a custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Returns the configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Reads an entry, evicting it if it has outlived the TTL
    pub fn get(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.get_at(key, Utc::now())
    }

    /// Reads an entry as of `now`
    ///
    /// An entry is fresh while `now - stored_at <= ttl`. Stale entries are
    /// removed and reported as absent.
    pub fn get_at(&mut self, key: &CacheKey, now: DateTime<Utc>) -> Option<CacheEntry> {
        let entry = self.entries.get(key)?;
        if now - entry.stored_at > self.ttl {
            self.entries.remove(key);
            return None;
        }
        Some(entry.clone())
    }

    /// Stores an entry, replacing any previous entry for the key
    pub fn put(&mut self, key: CacheKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    /// Drops the entry for a key, if any
    pub fn invalidate(&mut self, key: &CacheKey) {
        self.entries.remove(key);
    }

    /// Number of entries currently held, fresh or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
