//! The public output of one logical call.

use openrelay_core::tool::ToolCallDetail;
use openrelay_core::usage::Usage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The final result of one logical call: the answer plus full accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResult {
    /// The final content: a string for plain answers, a parsed object for
    /// structured output, or `null` when lenient structured parsing failed.
    pub content: Value,

    /// Cumulative token usage across every round trip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// The model that produced the final turn.
    pub model: String,

    /// Total tool invocations across the call.
    pub tool_calls_count: u32,

    /// Per-invocation audit details, in execution order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_call_details: Vec<ToolCallDetail>,

    /// The remote API's finish reason for the final turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    /// Estimated cost in USD; `None` when the model's price is unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,

    /// The remote generation id of the final turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Model reasoning attached to the final turn, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// Free-form model metadata attached to the final turn, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialization_omits_absent_fields() {
        let result = ChatCompletionResult {
            content: json!("4"),
            usage: None,
            model: "test".into(),
            tool_calls_count: 0,
            tool_call_details: Vec::new(),
            finish_reason: Some("stop".into()),
            cost: None,
            id: None,
            reasoning: None,
            annotations: None,
        };
        let body = serde_json::to_value(&result).unwrap();
        assert!(body.get("usage").is_none());
        assert!(body.get("cost").is_none());
        assert!(body.get("tool_call_details").is_none());
        assert_eq!(body["finish_reason"], "stop");
    }
}
