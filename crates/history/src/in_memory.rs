//! In-memory backend — useful for testing and ephemeral sessions.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use openrelay_core::error::HistoryError;
use openrelay_core::history::HistoryStore;
use openrelay_core::message::Message;
use tokio::sync::RwLock;
use tracing::debug;

struct Conversation {
    messages: Vec<Message>,
    last_touched: DateTime<Utc>,
}

/// An in-memory history store with optional TTL eviction.
///
/// Conversations untouched for longer than the TTL are evicted lazily on
/// the next access to the store.
pub struct InMemoryHistory {
    conversations: RwLock<HashMap<String, Conversation>>,
    ttl: Option<Duration>,
}

impl InMemoryHistory {
    /// Create a store that never evicts.
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            ttl: None,
        }
    }

    /// Create a store that evicts conversations idle for longer than `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            ttl: Some(ttl),
        }
    }

    /// Number of live conversations.
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn evict_expired(&self) {
        let Some(ttl) = self.ttl else { return };
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let now = Utc::now();

        let mut conversations = self.conversations.write().await;
        let before = conversations.len();
        conversations.retain(|_, c| now - c.last_touched < ttl);
        let evicted = before - conversations.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired conversations");
        }
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, key: &str) -> Result<Vec<Message>, HistoryError> {
        self.evict_expired().await;
        let mut conversations = self.conversations.write().await;
        match conversations.get_mut(key) {
            Some(conversation) => {
                conversation.last_touched = Utc::now();
                Ok(conversation.messages.clone())
            }
            None => Ok(Vec::new()),
        }
    }

    async fn append(&self, key: &str, messages: &[Message]) -> Result<(), HistoryError> {
        self.evict_expired().await;
        let mut conversations = self.conversations.write().await;
        let conversation = conversations.entry(key.to_string()).or_insert_with(|| Conversation {
            messages: Vec::new(),
            last_touched: Utc::now(),
        });
        conversation.messages.extend_from_slice(messages);
        conversation.last_touched = Utc::now();
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), HistoryError> {
        self.conversations.write().await.remove(key);
        Ok(())
    }
}
