//! Tool execution engine — runs one assistant turn's tool calls.
//!
//! Every failure mode at this level (missing tool, bad arguments, policy
//! denial, thrown error) degrades into an error-text tool result fed back
//! to the model; the conversation continues. The engine returns exactly one
//! outcome per input call, in input order, in both execution modes — the
//! remote API requires a one-to-one correspondence between tool-call ids
//! and tool-result messages.

use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use openrelay_core::error::ToolError;
use openrelay_core::event::{DomainEvent, EventBus};
use openrelay_core::identity::AuthIdentity;
use openrelay_core::message::{Message, ToolCall};
use openrelay_core::policy::{PolicyGate, ToolAuditRecord};
use openrelay_core::tool::{ExecutionContext, ToolCallDetail, ToolOutcome, ToolRegistry};
use serde_json::Value;
use tracing::{debug, warn};

/// Execute every tool call in an assistant turn.
///
/// `parallel` runs all calls concurrently and waits for all to settle;
/// sequential mode runs strictly one at a time. Output order is input
/// order in both modes, regardless of completion order.
pub async fn execute_tool_calls(
    assistant: &Message,
    registry: &ToolRegistry,
    gate: &dyn PolicyGate,
    identity: Option<&AuthIdentity>,
    events: &EventBus,
    parallel: bool,
) -> Vec<ToolOutcome> {
    let calls = &assistant.tool_calls;
    debug!(count = calls.len(), parallel, "Executing tool calls");

    if parallel {
        join_all(
            calls
                .iter()
                .map(|call| execute_single(call, registry, gate, identity, events)),
        )
        .await
    } else {
        let mut outcomes = Vec::with_capacity(calls.len());
        for call in calls {
            outcomes.push(execute_single(call, registry, gate, identity, events).await);
        }
        outcomes
    }
}

/// Process one tool call end to end. Never fails; errors become the
/// outcome's message text.
async fn execute_single(
    call: &ToolCall,
    registry: &ToolRegistry,
    gate: &dyn PolicyGate,
    identity: Option<&AuthIdentity>,
    events: &EventBus,
) -> ToolOutcome {
    let started = Instant::now();
    let (result, arguments) = run_checks_and_invoke(call, registry, gate, identity).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    let (content, success, error) = match result {
        Ok(value) => (render_success(value), true, None),
        Err(message) => {
            warn!(tool = %call.name, call_id = %call.id, error = %message, "Tool call failed");
            (
                format!("Error executing tool '{}': {message}", call.name),
                false,
                Some(message),
            )
        }
    };

    let detail = ToolCallDetail {
        tool_name: call.name.clone(),
        call_id: call.id.clone(),
        success,
        duration_ms,
        error,
    };

    // The audit record reaches the gate's logging hook and the event bus
    // whatever the outcome was.
    gate.record(&ToolAuditRecord {
        tool_name: detail.tool_name.clone(),
        call_id: detail.call_id.clone(),
        identity: identity.map(|i| i.id.clone()),
        arguments,
        success: detail.success,
        duration_ms: detail.duration_ms,
        error: detail.error.clone(),
        timestamp: Utc::now(),
    });
    events.publish(DomainEvent::ToolExecuted {
        tool_name: detail.tool_name.clone(),
        call_id: detail.call_id.clone(),
        success: detail.success,
        duration_ms: detail.duration_ms,
        timestamp: Utc::now(),
    });

    ToolOutcome {
        message: Message::tool_result(&call.id, content),
        detail,
    }
}

/// Resolve, parse, validate, authorize and invoke. Returns the success
/// value or a human-readable failure message, plus the parsed arguments
/// for auditing.
async fn run_checks_and_invoke(
    call: &ToolCall,
    registry: &ToolRegistry,
    gate: &dyn PolicyGate,
    identity: Option<&AuthIdentity>,
) -> (Result<Value, String>, Value) {
    let arguments = match parse_arguments(&call.arguments) {
        Ok(args) => args,
        Err(e) => return (Err(format!("invalid arguments: {e}")), Value::Null),
    };

    let Some(tool) = registry.get(&call.name) else {
        return (Err("tool not found".into()), arguments);
    };

    if let Some(schema) = tool.parameters_schema()
        && let Err(e) = schema.validate(&arguments)
    {
        return (Err(format!("arguments failed schema validation: {e}")), arguments);
    }

    // Policy denials carry their own reason; a rate-limit denial's display
    // includes the retry-after seconds.
    if let Err(denial) = gate.authorize(&call.name, identity, &arguments).await {
        return (Err(denial.to_string()), arguments);
    }

    let ctx = ExecutionContext {
        identity: identity.cloned(),
    };
    let result = tool
        .execute(arguments.clone(), &ctx)
        .await
        .map_err(|e: ToolError| e.to_string());
    (result, arguments)
}

/// An empty or `{}` argument string means "no arguments", not a parse error.
fn parse_arguments(raw: &str) -> Result<Value, serde_json::Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(trimmed)
}

/// Compact structured text for the model. Bare strings are passed through
/// unquoted so the model reads them as prose, not as JSON.
fn render_success(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
