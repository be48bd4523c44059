//! # openrelay Core
//!
//! Domain types, traits, and error definitions for the openrelay
//! chat-completion orchestration client. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the orchestration engine talks to (transport, history
//! store, policy gate, price oracle) is defined as a trait here.
//! Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod history;
pub mod identity;
pub mod message;
pub mod policy;
pub mod pricing;
pub mod schema;
pub mod tool;
pub mod transport;
pub mod usage;

// Re-export key types at crate root for ergonomics
pub use error::{Error, HistoryError, OrchestrationFailure, PolicyError, Result, ToolError, TransportError};
pub use event::{DomainEvent, EventBus};
pub use history::HistoryStore;
pub use identity::AuthIdentity;
pub use message::{Message, Role, ToolCall};
pub use policy::{NoopGate, PolicyGate, ToolAuditRecord};
pub use pricing::{ModelPricing, PriceOracle};
pub use schema::JsonSchema;
pub use tool::{ExecutionContext, FunctionTool, Tool, ToolCallDetail, ToolOutcome, ToolRegistry};
pub use transport::{ChatRequest, ChatResponse, Transport};
pub use usage::Usage;
