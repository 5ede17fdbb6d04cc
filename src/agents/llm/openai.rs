//! OpenAI-compatible chat completions provider (OpenAI, Groq)

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    api_key_from_env, http_client, CompletionRequest, CompletionResponse, FinishReason,
    LlmProvider, TokenUsage,
};
use crate::agents::config::LlmProviderConfig;
use crate::agents::domain::{Message, Role};
use crate::agents::error::{LlmError, LlmResult};

/// OpenAI-compatible LLM Provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    name: String,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    /// Create a new provider from configuration; the key comes from the environment
    pub fn new(config: &LlmProviderConfig, model: &str) -> LlmResult<Self> {
        let api_key = api_key_from_env(config)?;

        Ok(Self {
            client: http_client(config)?,
            name: config.provider.to_string(),
            api_key,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// Create a provider against an explicit endpoint
    pub fn with_endpoint(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            name: "openai".to_string(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Build the request body for the chat completions API
    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": request.model.as_ref().unwrap_or(&self.model),
            "messages": self.convert_messages(&request.messages),
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        if let Some(stop) = &request.stop {
            if !stop.is_empty() {
                body["stop"] = json!(stop);
            }
        }

        body
    }

    /// Convert internal messages to OpenAI format
    fn convert_messages(&self, messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    "content": m.content,
                })
            })
            .collect()
    }

    /// Parse a non-streaming response
    fn parse_response(&self, response: OpenAiResponse) -> LlmResult<CompletionResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Parse("No choices in response".to_string()))?;

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(CompletionResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            finish_reason: FinishReason::from_openai(choice.finish_reason.as_deref()),
            usage,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let body = self.build_request_body(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let openai_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("Failed to parse response: {}", e)))?;

        self.parse_response(openai_response)
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
