//! History store trait — persistent conversation history.
//!
//! A logical call seeds its message log from the store once before the first
//! round trip and appends the produced suffix once after the last. On
//! failure, only the messages produced after the seed are appended.

use async_trait::async_trait;

use crate::error::HistoryError;
use crate::message::Message;

/// The core HistoryStore trait.
///
/// Implementations: in-memory (with TTL eviction), no-op.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The backend name (e.g., "in_memory", "none").
    fn name(&self) -> &str;

    /// Load the ordered history for a conversation key.
    async fn get(&self, key: &str) -> std::result::Result<Vec<Message>, HistoryError>;

    /// Append messages to a conversation key.
    async fn append(&self, key: &str, messages: &[Message]) -> std::result::Result<(), HistoryError>;

    /// Remove a conversation entirely.
    async fn clear(&self, key: &str) -> std::result::Result<(), HistoryError>;
}
