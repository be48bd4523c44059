//! No-op history store — disables persistent history entirely.

use async_trait::async_trait;
use openrelay_core::error::HistoryError;
use openrelay_core::history::HistoryStore;
use openrelay_core::message::Message;

/// A history store that remembers nothing. The default collaborator when
/// the caller configures no persistence.
pub struct NoopHistory;

#[async_trait]
impl HistoryStore for NoopHistory {
    fn name(&self) -> &str {
        "none"
    }

    async fn get(&self, _key: &str) -> Result<Vec<Message>, HistoryError> {
        Ok(Vec::new())
    }

    async fn append(&self, _key: &str, _messages: &[Message]) -> Result<(), HistoryError> {
        Ok(())
    }

    async fn clear(&self, _key: &str) -> Result<(), HistoryError> {
        Ok(())
    }
}
