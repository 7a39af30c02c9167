//! Rate caching with TTL and stale reads.

use chrono::Duration;
use dashmap::DashMap;
use nerkh_common::{expires_in, is_expired, CurrencyCode, Rate, SourceId, Timestamp};
use std::fmt;
use tracing::debug;

/// Key of a cached quote.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: SourceId,
    pub base: CurrencyCode,
    pub quote: CurrencyCode,
}

impl CacheKey {
    pub fn new(source: SourceId, base: CurrencyCode, quote: CurrencyCode) -> Self {
        Self {
            source,
            base,
            quote,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.source, self.base, self.quote)
    }
}

/// Cached rate entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    rate: Rate,
    expires_at: Timestamp,
}

impl CacheEntry {
    fn new(rate: Rate, ttl: Duration) -> Self {
        Self {
            rate,
            expires_at: expires_in(ttl),
        }
    }

    fn is_fresh(&self) -> bool {
        !is_expired(self.expires_at)
    }
}

/// Configuration for rate cache.
#[derive(Debug, Clone)]
pub struct RateCacheConfig {
    /// Entry count above which expired entries are evicted on insert.
    pub max_entries: usize,
}

impl Default for RateCacheConfig {
    fn default() -> Self {
        Self { max_entries: 10000 }
    }
}

/// Thread-safe store of the latest successful quote per
/// `(source, base, quote)`.
///
/// Expired entries are kept so they can still be served through
/// [`RateCache::get_stale_allowed`] until evicted.
pub struct RateCache {
    cache: DashMap<CacheKey, CacheEntry>,
    config: RateCacheConfig,
}

impl RateCache {
    /// Create a new rate cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(RateCacheConfig::default())
    }

    /// Create a new rate cache with custom configuration.
    pub fn with_config(config: RateCacheConfig) -> Self {
        Self {
            cache: DashMap::new(),
            config,
        }
    }

    /// Get a rate if it has not expired.
    pub fn get(&self, key: &CacheKey) -> Option<Rate> {
        match self.cache.get(key) {
            Some(entry) if entry.is_fresh() => {
                debug!(key = %key, "Cache hit");
                Some(entry.rate.clone())
            }
            Some(_) => {
                debug!(key = %key, "Cache entry expired");
                None
            }
            None => {
                debug!(key = %key, "Cache miss");
                None
            }
        }
    }

    /// Get the most recent rate regardless of expiry.
    pub fn get_stale_allowed(&self, key: &CacheKey) -> Option<Rate> {
        self.cache.get(key).map(|entry| entry.rate.clone())
    }

    /// Insert a rate, replacing any previous entry for the key.
    pub fn put(&self, key: CacheKey, rate: Rate, ttl: Duration) {
        if self.cache.len() >= self.config.max_entries && !self.cache.contains_key(&key) {
            self.evict_expired();
        }

        self.cache.insert(key, CacheEntry::new(rate, ttl));
    }

    /// Clear all cached rates.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Get the number of entries in cache.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Evict expired entries.
    pub fn evict_expired(&self) {
        self.cache.retain(|_, entry| entry.is_fresh());
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let total = self.cache.len();
        let fresh = self.cache.iter().filter(|e| e.is_fresh()).count();

        CacheStats {
            total_entries: total,
            fresh_entries: fresh,
            expired_entries: total.saturating_sub(fresh),
        }
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub expired_entries: usize,
}
