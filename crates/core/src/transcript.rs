//! Transcript store trait: the durable, append-only message log.
//!
//! Messages are never updated or deleted once appended. Reads return
//! messages in insertion order.

use crate::error::TranscriptError;
use crate::message::{ConversationId, Message};
use async_trait::async_trait;

/// Implementations: CSV file, in-memory (for testing).
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// The backend name (e.g. "csv", "in_memory").
    fn name(&self) -> &str;

    /// Append one message. Each append is atomic on its own.
    async fn append(&self, message: &Message) -> Result<(), TranscriptError>;

    /// All messages of one conversation, oldest first.
    async fn conversation(&self, id: &ConversationId) -> Result<Vec<Message>, TranscriptError>;

    /// Every message in the store, oldest first.
    async fn all(&self) -> Result<Vec<Message>, TranscriptError>;
}
