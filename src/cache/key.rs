//! Cache key for a (conversation, message text) pair.

use sha2::{Digest, Sha256};

use crate::transport::ConversationId;

/// Cache key: the conversation and the exact message text.
///
/// The key is kept as a structured pair rather than a joined string, so
/// `(1, "2:x")` and `(12, "x")` can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    conversation: ConversationId,
    text: String,
}

impl CacheKey {
    pub fn new(conversation: ConversationId, text: impl Into<String>) -> Self {
        Self {
            conversation,
            text: text.into(),
        }
    }

    pub fn conversation(&self) -> ConversationId {
        self.conversation
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Short SHA-256 fingerprint used to correlate log lines without logging
    /// the message text itself.
    ///
    /// Uses length-prefixed encoding so the digest input is unambiguous.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.conversation.as_i64().to_le_bytes());
        hasher.update((self.text.len() as u64).to_le_bytes());
        hasher.update(self.text.as_bytes());
        let digest = hex::encode(hasher.finalize());
        digest[..12].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_cache_key_deterministic() {
        let k1 = CacheKey::new(ConversationId(7), "hello");
        let k2 = CacheKey::new(ConversationId(7), "hello");
        assert_eq!(k1, k2);
        assert_eq!(k1.fingerprint(), k2.fingerprint());
    }

    #[test]
    fn test_cache_key_conversation_aware() {
        let k1 = CacheKey::new(ConversationId(7), "hello");
        let k2 = CacheKey::new(ConversationId(8), "hello");
        assert_ne!(k1, k2);
        assert_ne!(k1.fingerprint(), k2.fingerprint());
    }

    #[test]
    fn test_cache_key_text_aware() {
        let k1 = CacheKey::new(ConversationId(7), "hello");
        let k2 = CacheKey::new(ConversationId(7), "hello ");
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_cache_key_no_separator_collision() {
        // A naive "{id}:{text}" join would turn both of these into "12:x".
        let k1 = CacheKey::new(ConversationId(1), "2:x");
        let k2 = CacheKey::new(ConversationId(12), "x");
        assert_ne!(k1, k2);
        assert_ne!(k1.fingerprint(), k2.fingerprint());

        let mut set = HashSet::new();
        set.insert(k1);
        set.insert(k2);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_fingerprint_is_short_hex() {
        let fp = CacheKey::new(ConversationId(1), "x").fingerprint();
        assert_eq!(fp.len(), 12);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
