//! In-memory transcript store, useful for testing and throwaway sessions.

use async_trait::async_trait;
use clerk_core::error::TranscriptError;
use clerk_core::message::{ConversationId, Message};
use clerk_core::TranscriptStore;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps every message in a Vec, in insertion order.
pub struct InMemoryTranscriptStore {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

impl Default for InMemoryTranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(&self, message: &Message) -> Result<(), TranscriptError> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn conversation(&self, id: &ConversationId) -> Result<Vec<Message>, TranscriptError> {
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .filter(|m| &m.conversation_id == id)
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<Message>, TranscriptError> {
        Ok(self.messages.read().await.clone())
    }
}
