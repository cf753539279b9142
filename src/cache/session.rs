//! Session tier: bounded capacity, time-to-live expiry, insertion-order eviction.
//!
//! Expiry is checked lazily when an entry is read. Capacity pressure first
//! drops whatever has already expired and then the entry that has been resident
//! longest. Overwriting a key refreshes both its timestamp and its position.

use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use super::CacheKey;

/// Default session tier capacity.
pub const DEFAULT_SESSION_CAPACITY: usize = 10_000;

/// Default session tier time-to-live in seconds.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
struct SessionEntry {
    response: String,
    /// Unix timestamp in milliseconds when the entry was written.
    created_at_ms: u64,
    /// Position in `order`.
    seq: u64,
}

/// TTL + capacity bounded map. Not synchronized; [`super::ResponseCache`]
/// wraps it in a mutex.
#[derive(Debug)]
pub struct SessionTier {
    entries: HashMap<CacheKey, SessionEntry>,
    order: BTreeMap<u64, CacheKey>,
    next_seq: u64,
    capacity: usize,
    ttl_secs: u64,
}

impl SessionTier {
    /// `capacity` is clamped to a minimum of 1.
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            capacity: capacity.max(1),
            ttl_secs,
        }
    }

    /// Return the cached response if present and younger than the TTL.
    pub fn get(&mut self, key: &CacheKey) -> Option<String> {
        self.get_at(key, now_millis())
    }

    /// Insert or overwrite `key`.
    pub fn insert(&mut self, key: CacheKey, response: String) {
        self.insert_at(key, response, now_millis());
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(now_millis())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub(crate) fn get_at(&mut self, key: &CacheKey, now_ms: u64) -> Option<String> {
        let expired = self.entries.get(key).map(|e| self.is_expired(e, now_ms));
        match expired {
            Some(true) => {
                debug!(key = %key.fingerprint(), "Session cache entry expired, removing");
                self.remove(key);
                None
            }
            Some(false) => self.entries.get(key).map(|e| e.response.clone()),
            None => None,
        }
    }

    pub(crate) fn insert_at(&mut self, key: CacheKey, response: String, now_ms: u64) {
        if let Some(old) = self.entries.get(&key) {
            self.order.remove(&old.seq);
        } else if self.entries.len() >= self.capacity {
            self.purge_expired_at(now_ms);
            while self.entries.len() >= self.capacity {
                if !self.evict_oldest() {
                    break;
                }
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.entries.insert(
            key,
            SessionEntry {
                response,
                created_at_ms: now_ms,
                seq,
            },
        );
    }

    pub(crate) fn purge_expired_at(&mut self, now_ms: u64) -> usize {
        // `order` is sorted by write time, so expired entries form a prefix.
        let mut removed = 0;
        while let Some((&seq, key)) = self.order.first_key_value() {
            let expired = self
                .entries
                .get(key)
                .map(|e| self.is_expired(e, now_ms))
                .unwrap_or(true);
            if !expired {
                break;
            }
            let key = key.clone();
            self.order.remove(&seq);
            self.entries.remove(&key);
            removed += 1;
        }
        removed
    }

    fn is_expired(&self, entry: &SessionEntry, now_ms: u64) -> bool {
        now_ms.saturating_sub(entry.created_at_ms) > self.ttl_secs.saturating_mul(1000)
    }

    fn evict_oldest(&mut self) -> bool {
        match self.order.pop_first() {
            Some((_, key)) => {
                debug!(key = %key.fingerprint(), "Evicting oldest session cache entry");
                self.entries.remove(&key);
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, key: &CacheKey) {
        if let Some(entry) = self.entries.remove(key) {
            self.order.remove(&entry.seq);
        }
    }

    /// Internal bookkeeping check: both indexes agree.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.entries.len() == self.order.len()
            && self
                .order
                .iter()
                .all(|(seq, k)| self.entries.get(k).map(|e| e.seq) == Some(*seq))
    }
}

fn now_millis() -> u64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
