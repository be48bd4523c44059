//! Policy enforcement for openrelay tool execution.
//!
//! Provides the reference [`PolicyGate`] implementation: a per-tool
//! allowlist, a sliding-window rate limiter, argument sanitization, and an
//! audit log with pluggable sinks.

mod audit;
mod gate;

pub use audit::{AuditLog, AuditSink, TracingSink};
pub use gate::{PolicyRules, RateLimit, StaticPolicyGate};

#[doc(inline)]
pub use openrelay_core::policy::{NoopGate, PolicyGate, ToolAuditRecord};
