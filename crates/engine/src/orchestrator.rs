//! The orchestration loop — one invocation per logical call.
//!
//! Implemented as an explicit `loop` over a single state struct rather than
//! recursion: each iteration is one network round trip, and the state
//! carries the append-only message log, the depth counter and the running
//! usage/tool-call accounting. The log is owned exclusively by the
//! in-flight call; it is seeded from the history store before the first
//! round trip and the produced suffix is appended back after the last.

use std::sync::Arc;

use chrono::Utc;
use openrelay_config::ClientConfig;
use openrelay_core::error::{Error, OrchestrationFailure, TransportError};
use openrelay_core::event::{DomainEvent, EventBus};
use openrelay_core::history::HistoryStore;
use openrelay_core::identity::AuthIdentity;
use openrelay_core::message::Message;
use openrelay_core::policy::{NoopGate, PolicyGate};
use openrelay_core::pricing::{NoopOracle, PriceOracle};
use openrelay_core::tool::{ToolCallDetail, ToolRegistry};
use openrelay_core::transport::{ApiErrorBody, ChatResponse, ToolChoice, Transport};
use openrelay_core::usage::Usage;
use openrelay_history::NoopHistory;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::builder::build_request;
use crate::executor::execute_tool_calls;
use crate::options::RequestOptions;
use crate::result::ChatCompletionResult;
use crate::structured::parse_structured;

/// The state threaded through one logical call.
struct LoopState {
    depth: u32,
    /// Append-only log for this call. Never shared, never rewritten.
    messages: Vec<Message>,
    /// Messages before this index came from the history seed; everything
    /// after is the suffix this call produced.
    seed_len: usize,
    usage: Option<Usage>,
    tool_calls_count: u32,
    tool_call_details: Vec<ToolCallDetail>,
}

/// The orchestration engine for chat completions.
///
/// Collaborators default to no-op implementations, so the loop always calls
/// one uniform interface and never branches on "is this configured".
pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    tools: Arc<ToolRegistry>,
    gate: Arc<dyn PolicyGate>,
    history: Arc<dyn HistoryStore>,
    oracle: Arc<dyn PriceOracle>,
    events: Arc<EventBus>,
    default_model: String,
    fallback_models: Vec<String>,
    max_tool_call_depth: u32,
    parallel_tool_calls: bool,
}

impl Orchestrator {
    /// Create an orchestrator with default collaborators.
    pub fn new(transport: Arc<dyn Transport>, default_model: impl Into<String>) -> Self {
        Self {
            transport,
            tools: Arc::new(ToolRegistry::new()),
            gate: Arc::new(NoopGate),
            history: Arc::new(NoopHistory),
            oracle: Arc::new(NoopOracle),
            events: Arc::new(EventBus::default()),
            default_model: default_model.into(),
            fallback_models: Vec::new(),
            max_tool_call_depth: 8,
            parallel_tool_calls: true,
        }
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_policy_gate(mut self, gate: Arc<dyn PolicyGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = history;
        self
    }

    pub fn with_price_oracle(mut self, oracle: Arc<dyn PriceOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_max_tool_call_depth(mut self, max: u32) -> Self {
        self.max_tool_call_depth = max;
        self
    }

    pub fn with_parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.parallel_tool_calls = parallel;
        self
    }

    pub fn with_fallback_models(mut self, models: Vec<String>) -> Self {
        self.fallback_models = models;
        self
    }

    /// Take model, fallback and loop settings from a loaded configuration.
    pub fn apply_config(mut self, config: &ClientConfig) -> Self {
        self.default_model = config.default_model.clone();
        self.fallback_models = config.fallback_models.clone();
        self.max_tool_call_depth = config.max_tool_call_depth;
        self.parallel_tool_calls = config.parallel_tool_calls;
        self
    }

    /// The event bus this orchestrator publishes to.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Convenience entry point: run a single user prompt.
    pub async fn run_prompt(
        &self,
        history_key: &str,
        prompt: impl Into<String>,
        options: RequestOptions,
    ) -> Result<ChatCompletionResult, OrchestrationFailure> {
        self.run(
            history_key,
            vec![Message::user(prompt)],
            options,
            None,
            CancellationToken::new(),
        )
        .await
    }

    /// Run one logical call to completion.
    ///
    /// Seeds the message log from the history store, drives round trips and
    /// tool executions until a terminal state, then appends the produced
    /// message suffix back to the store (also after failures, so the
    /// conversation survives partial progress). Cancellation aborts the
    /// in-flight request, issues no further round trips, and discards the
    /// accumulated accounting.
    pub async fn run(
        &self,
        history_key: &str,
        new_messages: Vec<Message>,
        options: RequestOptions,
        identity: Option<AuthIdentity>,
        cancel: CancellationToken,
    ) -> Result<ChatCompletionResult, OrchestrationFailure> {
        let seeded = self
            .history
            .get(history_key)
            .await
            .map_err(|e| OrchestrationFailure::bare(e.into()))?;

        let requested_model = options
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let parallel = options
            .parallel_tool_calls
            .unwrap_or(self.parallel_tool_calls);

        info!(
            history_key,
            model = %requested_model,
            seeded = seeded.len(),
            new = new_messages.len(),
            tools = self.tools.len(),
            "Starting orchestration"
        );

        let mut state = LoopState {
            depth: 0,
            seed_len: seeded.len(),
            messages: seeded,
            usage: None,
            tool_calls_count: 0,
            tool_call_details: Vec::new(),
        };
        state.messages.extend(new_messages);

        let tool_definitions = self.tools.definitions();

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(history_key, &state).await);
            }

            let mut turn_options = options.clone();
            turn_options.parallel_tool_calls = Some(parallel);
            if state.depth > 0 {
                // Tool-choice directives apply to the first turn only; every
                // follow-up turn goes back to letting the model decide.
                turn_options.tool_choice = Some(ToolChoice::Auto);
            }

            let request = match build_request(
                &requested_model,
                &state.messages,
                &tool_definitions,
                &turn_options,
                &self.fallback_models,
            ) {
                Ok(request) => request,
                Err(e) => return Err(self.fail(history_key, &state, e).await),
            };

            debug!(depth = state.depth, "Sending round trip");

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.cancelled(history_key, &state).await);
                }
                result = self.transport.send(&request) => match result {
                    Ok(response) => response,
                    Err(e) => return Err(self.fail(history_key, &state, e.into()).await),
                },
            };

            // A structured error object can ride in on a successful
            // transport status; classify it before looking at choices.
            if let Some(error_body) = &response.error {
                let error = classify_error_body(error_body);
                return Err(self.fail(history_key, &state, error).await);
            }

            state.usage = Usage::sum(state.usage, response.usage);

            let model_used = response
                .model
                .clone()
                .unwrap_or_else(|| requested_model.clone());

            let Some(choice) = response.choices.first() else {
                let error = Error::MalformedResponse("no choices in response".into());
                return Err(self.fail(history_key, &state, error).await);
            };
            let Some(response_message) = choice.message.as_ref() else {
                let error = Error::MalformedResponse("choice carries no message".into());
                return Err(self.fail(history_key, &state, error).await);
            };

            self.events.publish(DomainEvent::ResponseGenerated {
                model: model_used.clone(),
                depth: state.depth,
                tokens_used: response.usage.map(|u| u.total_tokens).unwrap_or(0),
                timestamp: Utc::now(),
            });

            let wants_tools = choice.finish_reason.as_deref() == Some("tool_calls")
                && !response_message.tool_calls.is_empty();

            if !wants_tools {
                return self
                    .finalize(history_key, state, &options, &response, model_used)
                    .await;
            }

            // --- Tool-request turn ---

            if self.tools.is_empty() {
                return Err(self.fail(history_key, &state, Error::ToolsNotConfigured).await);
            }
            if state.depth >= self.max_tool_call_depth {
                warn!(depth = state.depth, "Max tool call depth exceeded");
                let error = Error::MaxDepthExceeded { depth: state.depth };
                return Err(self.fail(history_key, &state, error).await);
            }
            if has_duplicate_call_ids(response_message) {
                let error =
                    Error::MalformedResponse("duplicate tool call ids in one turn".into());
                return Err(self.fail(history_key, &state, error).await);
            }

            let mut assistant = Message::assistant_tool_calls(
                response_message.content.clone(),
                response_message
                    .tool_calls
                    .iter()
                    .cloned()
                    .map(|tc| tc.into_tool_call())
                    .collect(),
            );
            assistant.reasoning = response_message.reasoning.clone();
            assistant.annotations = response_message.annotations.clone();

            let outcomes = execute_tool_calls(
                &assistant,
                &self.tools,
                self.gate.as_ref(),
                identity.as_ref(),
                &self.events,
                parallel,
            )
            .await;

            state.messages.push(assistant);
            state.tool_calls_count += outcomes.len() as u32;
            for outcome in outcomes {
                state.messages.push(outcome.message);
                state.tool_call_details.push(outcome.detail);
            }
            state.depth += 1;
        }
    }

    /// Terminal success: shape the content, price the call, persist the
    /// suffix and emit the completion event.
    async fn finalize(
        &self,
        history_key: &str,
        mut state: LoopState,
        options: &RequestOptions,
        response: &ChatResponse,
        model_used: String,
    ) -> Result<ChatCompletionResult, OrchestrationFailure> {
        let choice = &response.choices[0];
        let response_message = choice.message.as_ref().expect("checked by caller");

        let content = match &options.response_format {
            Some(format) => {
                match parse_structured(
                    response_message.content.as_deref(),
                    format,
                    options.strict_output,
                ) {
                    Ok(value) => value,
                    Err(e) => return Err(self.fail(history_key, &state, e).await),
                }
            }
            None => response_message
                .content
                .clone()
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null),
        };

        let mut final_message = Message::assistant("");
        final_message.content = response_message.content.clone();
        final_message.reasoning = response_message.reasoning.clone();
        final_message.annotations = response_message.annotations.clone();
        state.messages.push(final_message);

        self.append_suffix(history_key, &state).await;

        // Best effort: a model without a known price yields no cost.
        let cost = match (self.oracle.price_for(&model_used), state.usage) {
            (Some(pricing), Some(usage)) => Some(pricing.cost(&usage)),
            _ => None,
        };

        self.events.publish(DomainEvent::CallCompleted {
            model: model_used.clone(),
            total_tokens: state.usage.map(|u| u.total_tokens).unwrap_or(0),
            tool_calls: state.tool_calls_count,
            cost,
            success: true,
            timestamp: Utc::now(),
        });

        info!(
            model = %model_used,
            tool_calls = state.tool_calls_count,
            finish_reason = choice.finish_reason.as_deref().unwrap_or(""),
            "Orchestration complete"
        );

        Ok(ChatCompletionResult {
            content,
            usage: state.usage,
            model: model_used,
            tool_calls_count: state.tool_calls_count,
            tool_call_details: state.tool_call_details,
            finish_reason: choice.finish_reason.clone(),
            cost,
            id: response.id.clone(),
            reasoning: response_message.reasoning.clone(),
            annotations: response_message.annotations.clone(),
        })
    }

    /// Terminal failure: persist the produced suffix, emit the completion
    /// event, and attach the accumulated accounting to the error.
    async fn fail(
        &self,
        history_key: &str,
        state: &LoopState,
        error: Error,
    ) -> OrchestrationFailure {
        self.append_suffix(history_key, state).await;

        self.events.publish(DomainEvent::CallCompleted {
            model: self.default_model.clone(),
            total_tokens: state.usage.map(|u| u.total_tokens).unwrap_or(0),
            tool_calls: state.tool_calls_count,
            cost: None,
            success: false,
            timestamp: Utc::now(),
        });

        warn!(kind = error.kind(), error = %error, "Orchestration failed");

        OrchestrationFailure {
            error,
            usage: state.usage,
            tool_calls_count: state.tool_calls_count,
            tool_call_details: state.tool_call_details.clone(),
        }
    }

    /// Cancellation: persist the suffix but discard accounting — a
    /// cancelled call has no well-defined partial result.
    async fn cancelled(&self, history_key: &str, state: &LoopState) -> OrchestrationFailure {
        self.append_suffix(history_key, state).await;
        info!("Orchestration cancelled");
        OrchestrationFailure::bare(Error::Cancelled)
    }

    /// Append the messages this call produced. A store failure never
    /// overrides the call's own outcome.
    async fn append_suffix(&self, history_key: &str, state: &LoopState) {
        let suffix = &state.messages[state.seed_len..];
        if suffix.is_empty() {
            return;
        }
        if let Err(e) = self.history.append(history_key, suffix).await {
            warn!(history_key, error = %e, "Failed to append conversation history");
        }
    }
}

/// Map a structured error body to the error taxonomy by status code.
fn classify_error_body(body: &ApiErrorBody) -> Error {
    match body.code {
        Some(401) => TransportError::AuthenticationFailed(body.message.clone()).into(),
        Some(403) => TransportError::AccessDenied(body.message.clone()).into(),
        Some(429) => {
            let retry_after_secs = body
                .metadata
                .as_ref()
                .and_then(|m| m.get("retry_after"))
                .and_then(|v| v.as_u64())
                .unwrap_or(5);
            TransportError::RateLimited { retry_after_secs }.into()
        }
        code => TransportError::ApiError {
            status_code: code.and_then(|c| u16::try_from(c).ok()).unwrap_or(200),
            message: body.message.clone(),
        }
        .into(),
    }
}

/// Tool-call ids must be unique within a turn or results cannot be
/// correlated.
fn has_duplicate_call_ids(message: &openrelay_core::transport::ResponseMessage) -> bool {
    let mut seen = std::collections::HashSet::new();
    message.tool_calls.iter().any(|tc| !seen.insert(&tc.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use openrelay_core::tool::FunctionTool;
    use openrelay_core::transport::{ApiFunction, ApiToolCall, ChatRequest, Choice, ResponseMessage};
    use serde_json::json;
    use std::sync::Mutex;

    /// A transport that replays scripted responses and records requests.
    struct ScriptedTransport {
        responses: Mutex<std::collections::VecDeque<Result<ChatResponse, TransportError>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<ChatResponse, TransportError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(TransportError::Network("script exhausted".into()))
                })
        }
    }

    fn text_response(text: &str, finish: &str) -> ChatResponse {
        ChatResponse {
            id: Some("gen-1".into()),
            model: Some("test/model".into()),
            choices: vec![Choice {
                message: Some(ResponseMessage {
                    role: Some("assistant".into()),
                    content: Some(text.into()),
                    tool_calls: vec![],
                    reasoning: None,
                    annotations: None,
                }),
                finish_reason: Some(finish.into()),
            }],
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            error: None,
        }
    }

    fn tool_call_response(calls: Vec<(&str, &str, &str)>) -> ChatResponse {
        ChatResponse {
            id: Some("gen-tc".into()),
            model: Some("test/model".into()),
            choices: vec![Choice {
                message: Some(ResponseMessage {
                    role: Some("assistant".into()),
                    content: None,
                    tool_calls: calls
                        .into_iter()
                        .map(|(id, name, args)| ApiToolCall {
                            id: id.into(),
                            r#type: "function".into(),
                            function: ApiFunction {
                                name: name.into(),
                                arguments: args.into(),
                            },
                        })
                        .collect(),
                    reasoning: None,
                    annotations: None,
                }),
                finish_reason: Some("tool_calls".into()),
            }],
            usage: Some(Usage {
                prompt_tokens: 20,
                completion_tokens: 10,
                total_tokens: 30,
            }),
            error: None,
        }
    }

    fn add_registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(
                FunctionTool::builder("add")
                    .description("Adds two numbers")
                    .handler(|args, _| {
                        Box::pin(async move {
                            let a = args["a"].as_i64().unwrap_or(0);
                            let b = args["b"].as_i64().unwrap_or(0);
                            Ok(json!(a + b))
                        })
                    })
                    .build()
                    .unwrap(),
            ))
            .unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn plain_text_answer_is_one_round_trip() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(text_response("4", "stop"))]));
        let orchestrator = Orchestrator::new(transport.clone(), "test/model");

        let result = orchestrator
            .run_prompt("conv", "What's 2+2?", RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(result.content, json!("4"));
        assert_eq!(result.tool_calls_count, 0);
        assert_eq!(result.finish_reason.as_deref(), Some("stop"));
        assert_eq!(result.usage.unwrap().total_tokens, 15);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn tool_round_trip_accumulates_usage_and_details() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(tool_call_response(vec![("call_1", "add", r#"{"a":2,"b":2}"#)])),
            Ok(text_response("4", "stop")),
        ]));
        let orchestrator =
            Orchestrator::new(transport.clone(), "test/model").with_tools(add_registry());

        let result = orchestrator
            .run_prompt("conv", "add 2 and 2", RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(result.content, json!("4"));
        assert_eq!(result.tool_calls_count, 1);
        assert!(result.tool_call_details[0].success);
        // 30 from the tool turn + 15 from the final turn
        assert_eq!(result.usage.unwrap().total_tokens, 45);
        assert_eq!(transport.requests().len(), 2);

        // The follow-up request carries the assistant turn and the result,
        // with tool choice forced back to auto.
        let second = &transport.requests()[1];
        assert_eq!(second.tool_choice, Some(ToolChoice::Auto));
        let roles: Vec<_> = second.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["user", "assistant", "tool"]);
    }

    #[tokio::test]
    async fn depth_bound_terminates_looping_model() {
        let max_depth = 3;
        // A model that always asks for another tool call
        let responses: Vec<_> = (0..10)
            .map(|_| Ok(tool_call_response(vec![("call_1", "add", r#"{"a":1,"b":1}"#)])))
            .collect();
        let transport = Arc::new(ScriptedTransport::new(responses));
        let orchestrator = Orchestrator::new(transport.clone(), "test/model")
            .with_tools(add_registry())
            .with_max_tool_call_depth(max_depth);

        let failure = orchestrator
            .run_prompt("conv", "loop forever", RequestOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(failure.error, Error::MaxDepthExceeded { depth } if depth == max_depth));
        // Exactly max_depth tool rounds ran before the bound tripped
        assert_eq!(failure.tool_calls_count, max_depth);
        assert_eq!(transport.requests().len(), (max_depth + 1) as usize);
    }

    #[tokio::test]
    async fn tool_request_without_tools_is_terminal() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(tool_call_response(vec![(
            "call_1", "ghost", "{}",
        )]))]));
        let orchestrator = Orchestrator::new(transport, "test/model");

        let failure = orchestrator
            .run_prompt("conv", "hi", RequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(failure.error, Error::ToolsNotConfigured));
        // Usage from the one completed round trip is still reported
        assert_eq!(failure.usage.unwrap().total_tokens, 30);
    }

    #[tokio::test]
    async fn error_body_is_classified_by_code() {
        for (code, expected_kind) in [
            (401, "authentication"),
            (403, "access_denied"),
            (429, "rate_limit"),
            (500, "api"),
        ] {
            let transport = Arc::new(ScriptedTransport::new(vec![Ok(ChatResponse {
                error: Some(ApiErrorBody {
                    code: Some(code),
                    message: "remote error".into(),
                    metadata: None,
                }),
                ..Default::default()
            })]));
            let orchestrator = Orchestrator::new(transport, "test/model");

            let failure = orchestrator
                .run_prompt("conv", "hi", RequestOptions::default())
                .await
                .unwrap_err();
            assert_eq!(failure.error.kind(), expected_kind, "code {code}");
        }
    }

    #[tokio::test]
    async fn rate_limit_error_body_reads_retry_after_metadata() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(ChatResponse {
            error: Some(ApiErrorBody {
                code: Some(429),
                message: "slow down".into(),
                metadata: Some(json!({"retry_after": 17})),
            }),
            ..Default::default()
        })]));
        let orchestrator = Orchestrator::new(transport, "test/model");

        let failure = orchestrator
            .run_prompt("conv", "hi", RequestOptions::default())
            .await
            .unwrap_err();
        match failure.error {
            Error::Transport(TransportError::RateLimited { retry_after_secs }) => {
                assert_eq!(retry_after_secs, 17);
            }
            other => panic!("Expected RateLimited, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(ChatResponse::default())]));
        let orchestrator = Orchestrator::new(transport, "test/model");

        let failure = orchestrator
            .run_prompt("conv", "hi", RequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(failure.error, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn duplicate_call_ids_are_malformed() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(tool_call_response(vec![
            ("call_1", "add", "{}"),
            ("call_1", "add", "{}"),
        ]))]));
        let orchestrator =
            Orchestrator::new(transport, "test/model").with_tools(add_registry());

        let failure = orchestrator
            .run_prompt("conv", "hi", RequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(failure.error, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn transport_failure_keeps_accounting() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(tool_call_response(vec![("call_1", "add", r#"{"a":1,"b":2}"#)])),
            Err(TransportError::Timeout("deadline exceeded".into())),
        ]));
        let orchestrator =
            Orchestrator::new(transport, "test/model").with_tools(add_registry());

        let failure = orchestrator
            .run_prompt("conv", "hi", RequestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(failure.error.kind(), "timeout");
        assert_eq!(failure.tool_calls_count, 1);
        assert_eq!(failure.tool_call_details.len(), 1);
        assert_eq!(failure.usage.unwrap().total_tokens, 30);
    }

    #[tokio::test]
    async fn history_is_seeded_and_appended() {
        use openrelay_history::InMemoryHistory;

        let history = Arc::new(InMemoryHistory::new());
        history
            .append("conv", &[Message::system("be terse")])
            .await
            .unwrap();

        let transport = Arc::new(ScriptedTransport::new(vec![Ok(text_response("ok", "stop"))]));
        let orchestrator = Orchestrator::new(transport.clone(), "test/model")
            .with_history(history.clone());

        orchestrator
            .run_prompt("conv", "hello", RequestOptions::default())
            .await
            .unwrap();

        // The request saw the seeded system message
        let roles: Vec<_> = transport.requests()[0]
            .messages
            .iter()
            .map(|m| m.role.clone())
            .collect();
        assert_eq!(roles, ["system", "user"]);

        // The store gained only the suffix: user turn + final answer
        let stored = history.get("conv").await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[2].content.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn cost_comes_from_the_oracle() {
        struct FixedOracle;
        impl PriceOracle for FixedOracle {
            fn price_for(&self, _model: &str) -> Option<openrelay_core::pricing::ModelPricing> {
                Some(openrelay_core::pricing::ModelPricing::new(2.0, 10.0))
            }
        }

        let transport = Arc::new(ScriptedTransport::new(vec![Ok(text_response("hi", "stop"))]));
        let orchestrator =
            Orchestrator::new(transport, "test/model").with_price_oracle(Arc::new(FixedOracle));

        let result = orchestrator
            .run_prompt("conv", "hello", RequestOptions::default())
            .await
            .unwrap();

        // (10/1M)*2 + (5/1M)*10
        let expected = 10.0 / 1e6 * 2.0 + 5.0 / 1e6 * 10.0;
        assert!((result.cost.unwrap() - expected).abs() < 1e-15);
    }

    #[tokio::test]
    async fn unknown_price_never_blocks_the_result() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(text_response("hi", "stop"))]));
        let orchestrator = Orchestrator::new(transport, "test/model");

        let result = orchestrator
            .run_prompt("conv", "hello", RequestOptions::default())
            .await
            .unwrap();
        assert!(result.cost.is_none());
        assert_eq!(result.content, json!("hi"));
    }

    #[tokio::test]
    async fn pre_cancelled_token_stops_before_any_round_trip() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(text_response("hi", "stop"))]));
        let orchestrator = Orchestrator::new(transport.clone(), "test/model");

        let cancel = CancellationToken::new();
        cancel.cancel();

        let failure = orchestrator
            .run("conv", vec![Message::user("hi")], RequestOptions::default(), None, cancel)
            .await
            .unwrap_err();

        assert!(matches!(failure.error, Error::Cancelled));
        assert!(failure.usage.is_none());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn config_settings_apply() {
        let config = ClientConfig::from_toml(
            r#"
            default_model = "cfg/model"
            fallback_models = ["cfg/fallback"]
            max_tool_call_depth = 2
            parallel_tool_calls = false
            "#,
        )
        .unwrap();

        let transport = Arc::new(ScriptedTransport::new(vec![Ok(text_response("hi", "stop"))]));
        let orchestrator = Orchestrator::new(transport.clone(), "ignored").apply_config(&config);

        orchestrator
            .run_prompt("conv", "hello", RequestOptions::default())
            .await
            .unwrap();

        let request = &transport.requests()[0];
        // Global fallback list replaces the single model field
        assert!(request.model.is_none());
        assert_eq!(
            request.models.as_deref(),
            Some(["cfg/fallback".to_string()].as_slice())
        );
    }
}
