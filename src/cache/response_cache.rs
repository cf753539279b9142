//! Two-tier response cache shared by every in-flight message.
//!
//! Every store writes both tiers; blank responses are never stored or
//! served. Lookups read the global LRU tier only,
//! unless the cache is built with [`CacheReadPolicy::Freshest`], in which
//! case a global miss falls back to the TTL-checked session tier.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::global::{GlobalTier, DEFAULT_GLOBAL_CAPACITY};
use super::session::{SessionTier, DEFAULT_SESSION_CAPACITY, DEFAULT_SESSION_TTL_SECS};
use super::CacheKey;

/// Which tiers a lookup consults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheReadPolicy {
    /// Read the global LRU tier only. The session tier is write-only.
    #[default]
    GlobalOnly,
    /// Read the global tier, then the session tier (TTL applies).
    Freshest,
}

/// Sizing for both tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    pub session_capacity: usize,
    pub session_ttl_secs: u64,
    pub global_capacity: usize,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            session_capacity: DEFAULT_SESSION_CAPACITY,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            global_capacity: DEFAULT_GLOBAL_CAPACITY,
        }
    }
}

/// Session + global response cache.
///
/// Each tier sits behind its own mutex. Critical sections never call out of
/// the cache and leave the tier consistent, so a poisoned lock is recovered
/// instead of propagated: cache operations do not fail.
#[derive(Debug)]
pub struct ResponseCache {
    session: Mutex<SessionTier>,
    global: Mutex<GlobalTier>,
    read_policy: CacheReadPolicy,
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
}

impl ResponseCache {
    pub fn new(limits: CacheLimits, read_policy: CacheReadPolicy) -> Self {
        Self {
            session: Mutex::new(SessionTier::new(
                limits.session_capacity,
                limits.session_ttl_secs,
            )),
            global: Mutex::new(GlobalTier::new(limits.global_capacity)),
            read_policy,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
        }
    }

    /// Look up a cached response.
    pub fn lookup(&self, key: &CacheKey) -> Option<String> {
        let mut found = self.global().get(key).filter(|r| !is_blank(r));
        if found.is_none() && self.read_policy == CacheReadPolicy::Freshest {
            found = self.session().get(key).filter(|r| !is_blank(r));
        }

        match found {
            Some(response) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key.fingerprint(), "Response cache hit");
                Some(response)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a response in both tiers, overwriting any existing entry.
    /// Blank responses are skipped.
    pub fn store(&self, key: CacheKey, response: String) {
        if is_blank(&response) {
            debug!(key = %key.fingerprint(), "Refusing to cache blank response");
            return;
        }
        self.session().insert(key.clone(), response.clone());
        self.global().insert(key, response);
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn read_policy(&self) -> CacheReadPolicy {
        self.read_policy
    }

    /// Return aggregate statistics about the cache.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            session_entries: self.session().len(),
            global_entries: self.global().len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
        }
    }

    // -- private helpers ---------------------------------------------------

    fn session(&self) -> MutexGuard<'_, SessionTier> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn global(&self) -> MutexGuard<'_, GlobalTier> {
        self.global.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_blank(response: &str) -> bool {
    response.trim().is_empty()
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheLimits::default(), CacheReadPolicy::default())
    }
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub session_entries: usize,
    pub global_entries: usize,
    /// Lookups that returned a value.
    pub hits: u64,
    /// Lookups that returned nothing.
    pub misses: u64,
    /// Calls to [`ResponseCache::store`].
    pub stores: u64,
}
