use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// A cache entry with expiration time
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Concurrent in-memory cache with TTL support.
///
/// Clones share the same entries, so one cache can be handed to every spawned
/// fetch task. Expired entries are evicted lazily on lookup or in bulk with
/// `cleanup_expired`.
pub struct Cache<K, V>
where
    K: Eq + Hash,
{
    entries: Arc<DashMap<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Get a value from the cache if it exists and hasn't expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => {
                tracing::trace!(hit = true, "cache.get");
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        // the read guard is gone by now; removing under it would deadlock the shard
        if expired {
            self.entries.remove(key);
        }
        tracing::trace!(hit = false, "cache.get");
        None
    }

    pub fn set(&self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove expired entries. Returns how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, entry| now < entry.expires_at);
        let removed = before.saturating_sub(self.entries.len());
        tracing::debug!(removed, remaining = self.entries.len(), "cache.cleanup_expired");
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Clone for Cache<K, V>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
        }
    }
}
