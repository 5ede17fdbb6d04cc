//! LLM provider implementations
//!
//! This module provides a unified interface for the chat-completion backends
//! the agent can talk to:
//! - Groq and OpenAI (OpenAI-compatible `/chat/completions`)
//! - Google Gemini
//!
//! [`ResilientLlmClient`] wraps any provider with call pacing and retries.

mod gemini;
mod openai;
mod resilient;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use resilient::{classify_failure, retry_delay_for, CallPacer, FailureClass, ResilientLlmClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::agents::config::{LlmProviderConfig, LlmProviderType};
use crate::agents::domain::Message;
use crate::agents::error::{LlmError, LlmResult};

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;

    /// Complete a request
    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse>;
}

/// Request for LLM completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Messages in the conversation
    pub messages: Vec<Message>,
    /// Model to use (overrides provider default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Temperature for sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

/// Response from LLM completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated message
    pub message: Message,
    /// Reason the completion stopped
    pub finish_reason: FinishReason,
    /// Token usage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(message),
            finish_reason: FinishReason::Stop,
            usage: None,
        }
    }
}

/// Reason completion stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop or stop sequence
    Stop,
    /// Hit max tokens
    Length,
    /// Content filtered
    ContentFilter,
}

impl FinishReason {
    fn from_openai(reason: Option<&str>) -> Self {
        match reason {
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Build the shared HTTP client, honouring the configured timeout
fn http_client(config: &LlmProviderConfig) -> LlmResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.timeout_seconds {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| LlmError::InvalidRequest(format!("Failed to build HTTP client: {}", e)))
}

/// Read the API key from the configured environment variable
fn api_key_from_env(config: &LlmProviderConfig) -> LlmResult<String> {
    let env_var = config.api_key_env();
    std::env::var(env_var)
        .map_err(|_| LlmError::Authentication(format!("Environment variable {} not set", env_var)))
}

/// Create an LLM provider from configuration
pub fn create_provider(config: &LlmProviderConfig, model: &str) -> LlmResult<Arc<dyn LlmProvider>> {
    tracing::info!("Using {} provider with model {}", config.provider, model);
    match config.provider {
        LlmProviderType::Groq | LlmProviderType::OpenAI => {
            let provider = OpenAiProvider::new(config, model)?;
            Ok(Arc::new(provider))
        }
        LlmProviderType::Gemini => {
            let provider = GeminiProvider::new(config, model)?;
            Ok(Arc::new(provider))
        }
    }
}
