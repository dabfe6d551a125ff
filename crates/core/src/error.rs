//! Error types for the PipeClaw domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; only [`TurnError`] ever
//! escapes the agent loop. Tool failures are folded into the conversation.

use thiserror::Error;

/// The top-level error type for all PipeClaw operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model errors ---
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Turn errors ---
    #[error("Turn error: {0}")]
    Turn(#[from] TurnError),

    // --- History invariants ---
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failure while asking a [`crate::ModelResponder`] for the next step.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Rate limited by model endpoint, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Model did not answer within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Responder not configured: {0}")]
    NotConfigured(String),
}

/// Failure of a single tool call. Recovered locally by the loop.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Sandbox violation: {0}")]
    SandboxViolation(String),

    #[error("cancelled")]
    Cancelled,
}

impl ToolError {
    /// The JSON object recorded as the `tool` message content for this failure.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

/// An error that aborts the current turn.
#[derive(Debug, Clone, Error)]
pub enum TurnError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ModelError),

    #[error("Tool-call iteration limit of {limit} reached without a final answer")]
    IterationLimit { limit: u32 },

    #[error("Turn cancelled")]
    Cancelled,
}

/// A violation of the conversation history invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("tool message at index {index} has no tool_call_id")]
    MissingToolCallId { index: usize },

    #[error("tool message at index {index} answers unknown call '{call_id}'")]
    OrphanToolResult { index: usize, call_id: String },

    #[error("assistant message at index {index} carries both content and tool calls")]
    ContentWithToolCalls { index: usize },

    #[error("assistant message at index {index} has an empty tool call list")]
    EmptyToolCalls { index: usize },

    #[error("tool call id '{call_id}' is used more than once (index {index})")]
    DuplicateCallId { index: usize, call_id: String },

    #[error("tool call '{call_id}' is answered more than once (index {index})")]
    DuplicateToolResult { index: usize, call_id: String },

    #[error("tool call '{call_id}' issued at index {index} has no result")]
    UnansweredToolCall { index: usize, call_id: String },
}
