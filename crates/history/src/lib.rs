//! Conversation history backends for openrelay.
//!
//! The orchestration engine loads a conversation's history once before a
//! logical call starts and appends the produced messages once after it
//! ends. These backends implement that [`HistoryStore`] contract.

mod in_memory;
mod noop;

pub use in_memory::InMemoryHistory;
pub use noop::NoopHistory;

#[doc(inline)]
pub use openrelay_core::history::HistoryStore;
