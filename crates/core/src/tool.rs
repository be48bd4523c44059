//! Tool trait — the abstraction over caller-supplied capabilities.
//!
//! Callers register tools once, up front; the remote model decides when to
//! invoke them. Registration is the single normalization boundary: every
//! tool enters the registry as one canonical representation, so nothing
//! downstream ever branches on input shape.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, ToolError};
use crate::identity::AuthIdentity;
use crate::message::Message;
use crate::schema::JsonSchema;
use crate::transport::ToolDefinition;

/// Read-only context handed to a tool implementation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// The authenticated identity driving this call, if any.
    pub identity: Option<AuthIdentity>,
}

/// The core Tool trait.
///
/// Each tool the caller exposes to the model implements this trait. Tools
/// are registered in the [`ToolRegistry`] and offered to the model via
/// their [`ToolDefinition`]; the executable itself never leaves the client.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "add", "web_search").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters, if it declares one.
    fn parameters_schema(&self) -> Option<JsonSchema>;

    /// Execute the tool with parsed arguments and a read-only context.
    async fn execute(
        &self,
        arguments: Value,
        ctx: &ExecutionContext,
    ) -> std::result::Result<Value, ToolError>;

    /// Convert this tool into a [`ToolDefinition`] for the wire.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self
                .parameters_schema()
                .map(|s| s.as_value().clone())
                .unwrap_or_else(|| serde_json::json!({"type": "object", "properties": {}})),
        }
    }
}

type ToolFuture = Pin<Box<dyn Future<Output = std::result::Result<Value, ToolError>> + Send>>;
type ToolHandler = Arc<dyn Fn(Value, ExecutionContext) -> ToolFuture + Send + Sync>;

/// A tool backed by a closure — the canonical way to register a tool
/// without writing a trait impl.
///
/// All validation happens in [`FunctionToolBuilder::build`]; a tool that
/// made it into the registry is structurally sound.
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: Option<JsonSchema>,
    handler: ToolHandler,
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl FunctionTool {
    /// Start building a tool with the given name.
    pub fn builder(name: impl Into<String>) -> FunctionToolBuilder {
        FunctionToolBuilder {
            name: name.into(),
            description: String::new(),
            parameters: None,
            handler: None,
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Option<JsonSchema> {
        self.parameters.clone()
    }

    async fn execute(
        &self,
        arguments: Value,
        ctx: &ExecutionContext,
    ) -> std::result::Result<Value, ToolError> {
        (self.handler)(arguments, ctx.clone()).await
    }
}

/// Builder for [`FunctionTool`]. Rejects malformed tools at construction
/// time rather than letting them fail mid-conversation.
pub struct FunctionToolBuilder {
    name: String,
    description: String,
    parameters: Option<JsonSchema>,
    handler: Option<ToolHandler>,
}

impl FunctionToolBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attach a JSON Schema for this tool's parameters. Parsed arguments
    /// are validated against it before every invocation.
    pub fn parameters(mut self, schema: Value) -> Self {
        self.parameters = Some(JsonSchema::new(schema));
        self
    }

    pub fn handler<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, ExecutionContext) -> ToolFuture + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> std::result::Result<FunctionTool, Error> {
        if self.name.trim().is_empty() {
            return Err(Error::Config {
                message: "tool name must not be empty".into(),
            });
        }
        let handler = self.handler.ok_or_else(|| Error::Config {
            message: format!("tool '{}' has no handler", self.name),
        })?;
        Ok(FunctionTool {
            name: self.name,
            description: self.description,
            parameters: self.parameters,
            handler,
        })
    }
}

/// A registry of available tools.
///
/// The orchestration engine uses this to:
/// 1. Get tool definitions to offer the model
/// 2. Look up and execute tools when the model requests them
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    /// Rejects tools whose name is empty.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> std::result::Result<(), Error> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(Error::Config {
                message: "tool name must not be empty".into(),
            });
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Get all tool definitions (for offering to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

/// The audited record of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDetail {
    pub tool_name: String,
    pub call_id: String,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The result of one tool invocation: the message fed back to the model
/// plus the audit record kept for accounting.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub message: Message,
    pub detail: ToolCallDetail,
}
