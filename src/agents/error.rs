//! Error types for the SQL agent

use thiserror::Error;

use crate::persistence::error::PersistenceError;

/// Errors that can occur while building or running an agent
#[derive(Debug, Error)]
pub enum AgentError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Database error while preparing the agent
    #[error("Database error: {0}")]
    Persistence(#[from] PersistenceError),

    /// System prompt could not be rendered
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// No database has been initialized yet
    #[error("Agent not initialized. Call /init first.")]
    NotInitialized,
}

/// Errors specific to LLM provider operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// API error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the provider
    #[error("Rate limited: too many requests")]
    RateLimited,

    /// Authentication error
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,

    /// Daily or account quota is exhausted; retrying cannot succeed until it resets
    #[error("Daily token limit reached: {0}")]
    QuotaExhausted(String),

    /// Per-minute throttling outlasted every retry
    #[error("Rate limit persists after {retries} retries")]
    RateLimitPersisted { retries: u32 },
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_connect() {
            LlmError::Network(format!("Connection error: {}", err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

/// Errors raised while resolving or executing a tool call.
///
/// These never escape the dispatcher; they are rendered into observations.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing required parameter '{parameter}' for tool '{tool}'")]
    MissingParameter { tool: String, parameter: String },

    #[error("Parameter '{parameter}' for tool '{tool}' must be a string")]
    InvalidParameter { tool: String, parameter: String },

    #[error("Invalid identifier '{0}'. Only alphanumeric characters and underscores allowed.")]
    InvalidIdentifier(String),

    #[error("{0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Result type alias for tool operations
pub type ToolResult<T> = Result<T, ToolError>;
