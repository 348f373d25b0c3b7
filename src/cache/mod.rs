//! Cache module for storing fetched pages in memory
//!
//! This module provides a time-bounded response cache keyed by transport,
//! endpoint, search term and page. Entries expire after a fixed TTL and are
//! evicted lazily the next time they are read.

mod key;
mod manager;

pub use key::CacheKey;
pub use manager::{CacheEntry, ResponseCache, CACHE_TTL_MINUTES};
