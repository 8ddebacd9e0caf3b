//! In-memory implementation of MessageStore

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use relay_core::entities::InboundMessage;
use relay_core::traits::{MessageStore, RepoResult};

/// A message as recorded by [`MemoryMessageStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: u64,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only message log; ids start at 1 and increase by one per append
#[derive(Debug, Default)]
pub struct MemoryMessageStore {
    messages: Mutex<Vec<StoredMessage>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far
    pub fn messages(&self) -> Vec<StoredMessage> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn append(&self, message: &InboundMessage) -> RepoResult<u64> {
        let mut messages = self.messages.lock();
        let id = messages.len() as u64 + 1;
        messages.push(StoredMessage {
            id,
            username: message.sender.clone(),
            content: message.text.clone(),
            created_at: message.received_at,
        });
        Ok(id)
    }
}
