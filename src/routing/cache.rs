//! Pattern-keyed routing cache.
//!
//! Stores the authority's routing decisions under the pattern the authority
//! asked us to cache, and answers "which app serves this path?" for later
//! requests without consulting the authority again.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::observability::metrics;
use crate::routing::matcher::matches_pattern;

/// Longest lifetime an entry can get, whatever TTL was requested.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// A cached routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The `host + path` that produced this decision. Informational only.
    pub source_path: String,
    /// Storage key and match template.
    pub pattern: String,
    /// Application name matching requests are routed to.
    pub target: String,
    /// Whether a client may skip this entry for a single request.
    pub allow_bypass: bool,
    /// Absolute expiry.
    pub expires_at: Instant,
}

impl CacheEntry {
    /// An entry is live strictly before its expiry instant.
    pub fn is_live_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

/// `now + ttl_secs`, clamped to [`MAX_TTL`] so huge TTLs cannot overflow.
fn expiry(now: Instant, ttl_secs: u64) -> Instant {
    let ttl = Duration::from_secs(ttl_secs).min(MAX_TTL);
    now.checked_add(ttl)
        .or_else(|| now.checked_add(Duration::from_secs(24 * 60 * 60)))
        .unwrap_or(now)
}

/// A thread-safe cache of routing decisions, cheap to clone and share.
///
/// Lookups only take shard read locks; `store`, `invalidate` and `sweep`
/// take write locks. There is no insert-if-absent: concurrent misses for the
/// same pattern each store, and the last write wins.
#[derive(Clone, Default, Debug)]
pub struct RoutingCache {
    inner: Arc<DashMap<String, CacheEntry>>,
}

impl RoutingCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a live entry covering `full_path`.
    pub fn lookup(&self, full_path: &str) -> Option<CacheEntry> {
        self.lookup_at(full_path, Instant::now())
    }

    /// [`lookup`](Self::lookup) against an explicit clock reading.
    pub fn lookup_at(&self, full_path: &str, now: Instant) -> Option<CacheEntry> {
        if let Some(entry) = self.inner.get(full_path) {
            if entry.is_live_at(now) {
                return Some(entry.value().clone());
            }
        }

        // Expired entries are skipped here and left for the sweeper.
        self.inner
            .iter()
            .find(|r| r.value().is_live_at(now) && matches_pattern(full_path, r.key()))
            .map(|r| r.value().clone())
    }

    /// Insert or replace the decision stored under `pattern`.
    pub fn store(&self, source_path: &str, pattern: &str, target: &str, ttl_secs: u64, allow_bypass: bool) {
        self.store_at(source_path, pattern, target, ttl_secs, allow_bypass, Instant::now());
    }

    /// [`store`](Self::store) against an explicit clock reading.
    pub fn store_at(
        &self,
        source_path: &str,
        pattern: &str,
        target: &str,
        ttl_secs: u64,
        allow_bypass: bool,
        now: Instant,
    ) {
        let entry = CacheEntry {
            source_path: source_path.to_string(),
            pattern: pattern.to_string(),
            target: target.to_string(),
            allow_bypass,
            expires_at: expiry(now, ttl_secs),
        };
        self.inner.insert(pattern.to_string(), entry);
        metrics::record_cache_mutation("store");
        metrics::record_cache_size(self.inner.len());
    }

    /// Remove the entry stored under `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.inner.remove(key).is_some();
        if removed {
            metrics::record_cache_mutation("invalidate");
            metrics::record_cache_size(self.inner.len());
        }
        removed
    }

    /// Remove every entry whose pattern covers `full_path`, live or not.
    ///
    /// This is how an authority `invalidate` instruction is applied: the
    /// instruction carries no pattern, so the entries that would have routed
    /// the current path are the ones dropped.
    pub fn invalidate_path(&self, full_path: &str) -> usize {
        let before = self.inner.len();
        self.inner.retain(|pattern, _| !matches_pattern(full_path, pattern));
        let removed = before.saturating_sub(self.inner.len());
        if removed > 0 {
            metrics::record_cache_mutation("invalidate");
            metrics::record_cache_size(self.inner.len());
        }
        removed
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// [`sweep`](Self::sweep) against an explicit clock reading.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.is_live_at(now));
        let removed = before.saturating_sub(self.inner.len());
        metrics::record_cache_size(self.inner.len());
        removed
    }

    /// Snapshot of every stored entry, expired ones included.
    pub fn entries(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<_> = self.inner.iter().map(|r| r.value().clone()).collect();
        entries.sort_by(|a, b| a.pattern.cmp(&b.pattern));
        entries
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
