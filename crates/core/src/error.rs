//! Error types for the Assemble domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Assemble operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- LLM errors ---
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("State '{from}' transitioned to unknown state '{to}'")]
    DanglingTransition { from: String, to: String },

    #[error("Run executed no steps (initial state '{initial_state}' is not configured)")]
    EmptyRun { initial_state: String },

    // --- Prompt / response handling ---
    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Mailbox boundary ---
    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Agent unavailable: {0}")]
    Unavailable(String),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True for the fatal configuration family: bad construction arguments,
    /// dangling transitions and runs that never executed a state.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::DanglingTransition { .. } | Self::EmptyRun { .. }
        )
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Invalid tool name: '{0}'")]
    InvalidName(String),

    #[error("Duplicate tool name: '{0}'")]
    DuplicateName(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Message log is empty")]
    EmptyMessageLog,

    #[error("Missing value for slot '{0}'")]
    MissingSlot(String),
}
