//! In-process transcript store.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{Direction, PersistenceError, TranscriptRecord, TranscriptStore};
use crate::transport::ConversationId;

/// Keeps records in a `Vec` for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryTranscriptStore {
    records: Mutex<Vec<TranscriptRecord>>,
}

impl MemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record written so far, in write order.
    pub fn records(&self) -> Vec<TranscriptRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records for one conversation, in write order.
    pub fn conversation(&self, conversation: ConversationId) -> Vec<TranscriptRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.conversation == conversation)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, record: TranscriptRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn record_inbound(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> Result<(), PersistenceError> {
        self.push(TranscriptRecord::new(conversation, Direction::Inbound, text));
        Ok(())
    }

    async fn record_outbound(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> Result<(), PersistenceError> {
        self.push(TranscriptRecord::new(conversation, Direction::Outbound, text));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_appends_in_order() {
        let store = MemoryTranscriptStore::new();
        assert!(store.is_empty());
        tokio_test::block_on(async {
            store.record_inbound(ConversationId(1), "hi").await.unwrap();
            store.record_outbound(ConversationId(1), "hello").await.unwrap();
            store.record_inbound(ConversationId(2), "other").await.unwrap();
        });

        let records = store.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].direction, Direction::Inbound);
        assert_eq!(records[1].direction, Direction::Outbound);
        assert_eq!(records[1].text, "hello");

        let convo = store.conversation(ConversationId(1));
        assert_eq!(convo.len(), 2);
    }
}
