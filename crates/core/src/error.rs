//! Error types for the Codewright domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] aggregates them.

use thiserror::Error;

/// The top-level error type for all Codewright operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Transport errors ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Pipeline errors ---
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    // --- Session store errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

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

/// Failures talking to the model backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The backend answered with a non-success HTTP status.
    #[error("model backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// The response body could not be decoded into any known shape.
    #[error("failed to decode model response: {0}")]
    Decode(String),

    /// The backend answered successfully but offered zero completions.
    #[error("model returned no completion candidates")]
    EmptyResponse,

    #[error("transport not configured: {0}")]
    NotConfigured(String),
}

impl TransportError {
    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// The handler itself failed (as opposed to reporting `success: false`).
    #[error("Tool execution failed: {tool_name}: {cause}")]
    Execution { tool_name: String, cause: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool call {0} was already dispatched")]
    DuplicateCall(String),
}

impl ToolError {
    /// Wrap an arbitrary handler failure as an execution error for `tool_name`.
    pub fn execution(tool_name: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Execution {
            tool_name: tool_name.into(),
            cause: cause.to_string(),
        }
    }
}

/// A single planner step that failed. Recorded per step, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[error("step {index} ({action}) failed: {message}")]
pub struct PlanStepError {
    /// 1-based step position in the plan.
    pub index: usize,
    pub action: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A middleware refused the input.
    #[error("input rejected: {0}")]
    Rejected(String),

    #[error("processor '{name}' failed: {message}")]
    Processor { name: String, message: String },

    #[error("hook '{event}' failed: {message}")]
    Hook { event: String, message: String },

    /// The component wrapped by the pipeline failed.
    #[error("{0}")]
    Downstream(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),
}
