//! Global tier: bounded least-recently-used map, no expiry.

use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::debug;

use super::CacheKey;

/// Default global tier capacity.
pub const DEFAULT_GLOBAL_CAPACITY: usize = 1_000;

/// LRU bounded map. Reading an entry refreshes its recency.
pub struct GlobalTier {
    entries: LruCache<CacheKey, String>,
}

impl GlobalTier {
    /// `capacity` is clamped to a minimum of 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<String> {
        self.entries.get(key).cloned()
    }

    /// Insert or overwrite `key`, evicting the least recently read entry when full.
    pub fn insert(&mut self, key: CacheKey, response: String) {
        if let Some((evicted, _)) = self.entries.push(key.clone(), response) {
            if evicted != key {
                debug!(key = %evicted.fingerprint(), "Evicting LRU global cache entry");
            }
        }
    }

    /// Membership check that does not touch recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> Vec<CacheKey> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }
}

impl std::fmt::Debug for GlobalTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalTier")
            .field("len", &self.entries.len())
            .field("capacity", &self.entries.cap())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ConversationId;

    fn key(i: i64) -> CacheKey {
        CacheKey::new(ConversationId(i), "same text")
    }

    #[test]
    fn test_global_lru_evicts_least_recently_read() {
        let mut tier = GlobalTier::new(3);
        for i in 0..3 {
            tier.insert(key(i), format!("v{i}"));
        }
        tier.insert(key(3), "v3".into());
        assert_eq!(tier.len(), 3);
        assert!(!tier.contains(&key(0)));
        assert!(tier.contains(&key(1)));
        assert!(tier.contains(&key(3)));
    }

    #[test]
    fn test_global_read_protects_from_eviction() {
        let mut tier = GlobalTier::new(3);
        for i in 0..3 {
            tier.insert(key(i), format!("v{i}"));
        }
        assert_eq!(tier.get(&key(0)), Some("v0".into()));
        tier.insert(key(3), "v3".into());
        assert!(tier.contains(&key(0)), "recently read key must survive");
        assert!(!tier.contains(&key(1)), "key 1 is now least recently used");
    }

    #[test]
    fn test_global_overwrite_keeps_size() {
        let mut tier = GlobalTier::new(2);
        tier.insert(key(0), "a".into());
        tier.insert(key(0), "b".into());
        assert_eq!(tier.len(), 1);
        assert_eq!(tier.get(&key(0)), Some("b".into()));
    }

    #[test]
    fn test_global_capacity_zero_clamped() {
        let tier = GlobalTier::new(0);
        assert_eq!(tier.capacity(), 1);
    }
}
