//! Error types for the openrelay domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant; terminal orchestration
//! failures are wrapped in [`OrchestrationFailure`] so the accounting
//! accumulated before the failure survives for observability.

use thiserror::Error;

use crate::tool::ToolCallDetail;
use crate::usage::Usage;

/// The top-level error type for all openrelay operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Transport errors ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // --- History store errors ---
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    // --- Tool errors (only those that escape local recovery) ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors (bad caller input) ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Structured-output / schema validation ---
    #[error("Validation error: {message}")]
    Validation { message: String },

    // --- Response shape the loop cannot interpret ---
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    // --- The model asked for tools the caller never offered ---
    #[error("Model requested tool calls but no tools were configured")]
    ToolsNotConfigured,

    // --- Tool-call recursion bound ---
    #[error("Maximum tool call depth exceeded at depth {depth}")]
    MaxDepthExceeded { depth: u32 },

    // --- External cancellation ---
    #[error("Call was cancelled")]
    Cancelled,

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Machine-readable error kind, stable across message changes.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Transport(TransportError::AuthenticationFailed(_)) => "authentication",
            Error::Transport(TransportError::AccessDenied(_)) => "access_denied",
            Error::Transport(TransportError::RateLimited { .. }) => "rate_limit",
            Error::Transport(TransportError::Timeout(_)) => "timeout",
            Error::Transport(TransportError::Network(_)) => "network",
            Error::Transport(TransportError::ApiError { .. }) => "api",
            Error::History(_) => "history",
            Error::Tool(_) => "tool",
            Error::Config { .. } => "configuration",
            Error::Validation { .. } => "validation",
            Error::MalformedResponse(_) => "api",
            Error::ToolsNotConfigured => "configuration",
            Error::MaxDepthExceeded { .. } => "max_depth",
            Error::Cancelled => "cancelled",
            Error::Serialization(_) => "validation",
            Error::Internal(_) => "internal",
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

/// Policy gate decisions that deny a tool invocation.
///
/// These never terminate the orchestration; the executor degrades them into
/// tool-result error text fed back to the model.
#[derive(Debug, Clone, Error)]
pub enum PolicyError {
    #[error("Tool '{tool_name}' denied: {reason}")]
    Denied { tool_name: String, reason: String },

    #[error("Tool '{tool_name}' rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        tool_name: String,
        retry_after_secs: u64,
    },

    #[error("Invalid arguments for tool '{tool_name}': {reason}")]
    InvalidArguments { tool_name: String, reason: String },
}

/// A terminal orchestration failure.
///
/// Carries whatever usage and tool-call accounting had accumulated before
/// the failure, so callers keep partial observability even when a call dies.
/// Cancelled calls carry no accounting — a cancelled call has no
/// well-defined partial result.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct OrchestrationFailure {
    #[source]
    pub error: Error,
    pub usage: Option<Usage>,
    pub tool_calls_count: u32,
    pub tool_call_details: Vec<ToolCallDetail>,
}

impl OrchestrationFailure {
    /// A failure with no accumulated accounting.
    pub fn bare(error: Error) -> Self {
        Self {
            error,
            usage: None,
            tool_calls_count: 0,
            tool_call_details: Vec::new(),
        }
    }
}

impl From<Error> for OrchestrationFailure {
    fn from(error: Error) -> Self {
        Self::bare(error)
    }
}
