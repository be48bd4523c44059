//! # openrelay Engine
//!
//! The orchestration core: turns one caller request into a bounded chain of
//! API round trips, tool executions and message-log extensions, producing a
//! single typed [`ChatCompletionResult`].
//!
//! The engine is organized the way the control flow runs:
//! - [`builder`] shapes a transport-ready request (pure, no I/O)
//! - [`executor`] runs one assistant turn's tool calls
//! - [`orchestrator`] drives the loop and owns the per-call state
//! - [`structured`] parses and validates structured final content

pub mod builder;
pub mod executor;
pub mod options;
pub mod orchestrator;
pub mod result;
pub mod structured;

pub use options::{OutputFormat, RequestOptions};
pub use orchestrator::Orchestrator;
pub use result::ChatCompletionResult;
