//! Request builder — pure transformation from orchestration inputs to a
//! transport-ready payload. No network, no I/O.

use openrelay_core::error::Error;
use openrelay_core::message::{Message, Role};
use openrelay_core::transport::{
    ApiFunction, ApiMessage, ApiTool, ApiToolCall, ChatRequest, ProviderRouting, ResponseFormat,
    JsonSchemaFormat, ToolChoice, ToolDefinition,
};

use crate::options::{OutputFormat, RequestOptions};

/// Filter messages down to the fields the remote API accepts.
///
/// Internal bookkeeping (ids, timestamps, reasoning, annotations) is
/// stripped. The filter is a fixed point: output fed back in maps to itself.
pub fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
    messages
        .iter()
        .map(|m| ApiMessage {
            role: match m.role {
                Role::System => "system".into(),
                Role::User => "user".into(),
                Role::Assistant => "assistant".into(),
                Role::Tool => "tool".into(),
            },
            content: m.content.clone(),
            tool_calls: if m.tool_calls.is_empty() {
                None
            } else {
                Some(
                    m.tool_calls
                        .iter()
                        .map(|tc| ApiToolCall {
                            id: tc.id.clone(),
                            r#type: "function".into(),
                            function: ApiFunction {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: m.tool_call_id.clone(),
            name: m.name.clone(),
        })
        .collect()
}

/// Build a transport-ready request.
///
/// Tool-choice rule: an explicit caller directive always wins; otherwise
/// the policy defaults to `auto` when tools exist and the field is omitted
/// entirely when none do (an explicit `none` is still forwarded with zero
/// tools).
pub fn build_request(
    default_model: &str,
    messages: &[Message],
    tools: &[ToolDefinition],
    options: &RequestOptions,
    global_fallback_models: &[String],
) -> Result<ChatRequest, Error> {
    if let Some(max_tokens) = options.max_tokens
        && max_tokens == 0
    {
        return Err(Error::Config {
            message: "max_tokens must be a positive integer".into(),
        });
    }

    let mut request = ChatRequest {
        messages: to_api_messages(messages),
        ..Default::default()
    };

    // An explicit per-request model list takes priority over the global
    // fallback list; either one replaces the single model field.
    if !options.models.is_empty() {
        request.models = Some(options.models.clone());
    } else if !global_fallback_models.is_empty() {
        request.models = Some(global_fallback_models.to_vec());
    } else {
        request.model = Some(
            options
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
        );
    }

    if tools.is_empty() {
        if options.tool_choice == Some(ToolChoice::None) {
            request.tool_choice = Some(ToolChoice::None);
        }
    } else {
        request.tools = Some(tools.iter().cloned().map(ApiTool::from).collect());
        request.tool_choice = Some(options.tool_choice.unwrap_or(ToolChoice::Auto));
        request.parallel_tool_calls = Some(options.parallel_tool_calls.unwrap_or(true));
    }

    if let Some(format) = &options.response_format {
        request.response_format = Some(match format {
            OutputFormat::JsonObject => ResponseFormat::JsonObject,
            OutputFormat::JsonSchema { name, schema } => ResponseFormat::JsonSchema {
                json_schema: JsonSchemaFormat {
                    name: name.clone(),
                    strict: true,
                    schema: schema.clone(),
                },
            },
        });

        // A schema contract is worthless if routed to a provider that
        // ignores the parameter; opt into parameter-guaranteeing routing
        // unless the caller already chose.
        if matches!(format, OutputFormat::JsonSchema { .. }) && options.provider.is_none() {
            request.provider = Some(ProviderRouting {
                require_parameters: Some(true),
            });
        }
    }
    if let Some(provider) = &options.provider {
        request.provider = Some(provider.clone());
    }

    request.temperature = options.temperature;
    request.top_p = options.top_p;
    request.frequency_penalty = options.frequency_penalty;
    request.presence_penalty = options.presence_penalty;
    request.logit_bias = options.logit_bias.clone();
    request.seed = options.seed;
    request.max_tokens = options.max_tokens;
    if !options.stop.is_empty() {
        request.stop = Some(options.stop.clone());
    }

    Ok(request)
}
