//! Response caching: a TTL session tier and an LRU global tier.

pub mod global;
pub mod key;
pub mod response_cache;
pub mod session;

pub use global::GlobalTier;
pub use key::CacheKey;
pub use response_cache::{CacheLimits, CacheReadPolicy, CacheStats, ResponseCache};
pub use session::SessionTier;
