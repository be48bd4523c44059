//! Per-request options supplied by the caller.

use serde_json::Value;

use openrelay_core::transport::{ProviderRouting, ToolChoice};

/// A structured-output contract requested for the final turn's content.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    /// Any syntactically valid JSON object.
    JsonObject,
    /// A JSON object validated against the given schema.
    JsonSchema { name: String, schema: Value },
}

/// Options for one logical call.
///
/// Everything is optional; unset fields fall back to the orchestrator's
/// configured defaults or are omitted from the wire payload entirely.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Target model. `None` uses the orchestrator default.
    pub model: Option<String>,

    /// Per-request ordered fallback list. Takes priority over the
    /// orchestrator's global fallback list.
    pub models: Vec<String>,

    // --- Generation parameters, forwarded only when present ---
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub stop: Vec<String>,
    pub logit_bias: Option<serde_json::Map<String, Value>>,
    pub seed: Option<i64>,
    /// Must be a positive integer when set.
    pub max_tokens: Option<u32>,

    // --- Tool directives ---
    /// Explicit tool-selection policy. When unset, defaults to `auto` if
    /// tools are configured and is omitted otherwise.
    pub tool_choice: Option<ToolChoice>,
    /// Whether the model may request several tool calls in one turn, and
    /// whether this client runs them concurrently. Defaults to the
    /// orchestrator configuration.
    pub parallel_tool_calls: Option<bool>,

    // --- Output shaping ---
    pub response_format: Option<OutputFormat>,
    /// When true, a final answer that fails the requested format raises a
    /// validation error; when false it degrades to null content.
    pub strict_output: bool,

    // --- Routing ---
    pub provider: Option<ProviderRouting>,
}

impl RequestOptions {
    /// Options targeting a specific model.
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Default::default()
        }
    }
}
