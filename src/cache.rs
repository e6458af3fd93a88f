//! Token cache with TTL expiry
//!
//! Maps an opaque token to the tenant id the identity provider resolved for
//! it. An entry only ever exists because the provider accepted the token
//! within the last TTL; nothing else inserts, and nothing but expiry removes.
//! Rejections are never cached.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

/// Key/value store holding verified tokens.
///
/// Implementations must be safe to share between concurrent requests and
/// provide per-entry atomicity: a reader never observes a half-written entry.
pub trait TokenCache: Send + Sync {
    /// Whether a live (unexpired) entry exists for `token`
    fn exists(&self, token: &str) -> bool {
        self.get(token).is_some()
    }

    /// Tenant id cached for `token`, or `None` if absent or expired
    fn get(&self, token: &str) -> Option<String>;

    /// Insert or overwrite the entry for `token`, expiring `ttl` from now
    fn put(&self, token: &str, tenant_id: &str, ttl: Duration);
}

/// A cached tenant id with TTL metadata
struct CachedTenant {
    tenant_id: String,
    cached_at: Instant,
    ttl: Duration,
}

impl CachedTenant {
    fn is_expired(&self) -> bool {
        self.cached_at.elapsed() >= self.ttl
    }
}

/// Cache statistics tracked atomically
#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// In-process token cache backed by a sharded concurrent map
pub struct InMemoryTokenCache {
    /// Cache name, carried into log records and stats
    name: String,
    entries: DashMap<String, CachedTenant>,
    stats: CacheStats,
}

impl InMemoryTokenCache {
    /// Create an empty cache
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: DashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Cache name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn evict_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let evicted = before.saturating_sub(self.entries.len());

        if evicted > 0 {
            self.stats
                .evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(cache = %self.name, evicted, "Swept expired tokens");
        }
        evicted
    }

    /// Snapshot of the cache counters
    pub fn stats(&self) -> CacheStatsSnapshot {
        let hits = self.stats.hits.load(Ordering::Relaxed);
        let misses = self.stats.misses.load(Ordering::Relaxed);
        CacheStatsSnapshot {
            hits,
            misses,
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            size: self.entries.len(),
        }
    }
}

impl TokenCache for InMemoryTokenCache {
    fn get(&self, token: &str) -> Option<String> {
        let Some(entry) = self.entries.get(token) else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        if entry.is_expired() {
            drop(entry);
            // A concurrent put may have refreshed the entry since the check
            if self
                .entries
                .remove_if(token, |_, e| e.is_expired())
                .is_some()
            {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            None
        } else {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            Some(entry.tenant_id.clone())
        }
    }

    fn put(&self, token: &str, tenant_id: &str, ttl: Duration) {
        self.entries.insert(
            token.to_string(),
            CachedTenant {
                tenant_id: tenant_id.to_string(),
                cached_at: Instant::now(),
                ttl,
            },
        );
    }
}

/// Snapshot of cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStatsSnapshot {
    /// Lookups answered from a live entry
    pub hits: u64,
    /// Lookups that found nothing or an expired entry
    pub misses: u64,
    /// Entries dropped because their TTL elapsed
    pub evictions: u64,
    /// Entries currently held, expired ones included until swept
    pub size: usize,
}
