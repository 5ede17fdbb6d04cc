//! Google Gemini LLM Provider

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

/// Google Gemini LLM Provider
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider from configuration
    pub fn new(config: &LlmProviderConfig, model: &str) -> LlmResult<Self> {
        let api_key = api_key_from_env(config)?;

        Ok(Self {
            client: http_client(config)?,
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
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Build the request body for Gemini API
    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let (system, contents) = self.convert_messages(&request.messages);
        let mut body = json!({ "contents": contents });

        if let Some(system) = system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        // Generation config
        let mut generation_config = json!({});

        if let Some(temp) = request.temperature {
            generation_config["temperature"] = json!(temp);
        }

        if let Some(max_tokens) = request.max_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }

        if let Some(stop) = &request.stop {
            if !stop.is_empty() {
                generation_config["stopSequences"] = json!(stop);
            }
        }

        if generation_config.as_object().is_some_and(|o| !o.is_empty()) {
            body["generationConfig"] = generation_config;
        }

        body
    }

    /// Split out the system prompt and convert the rest to Gemini contents
    fn convert_messages(&self, messages: &[Message]) -> (Option<String>, Vec<Value>) {
        let mut system: Option<String> = None;
        let mut contents = Vec::new();

        for m in messages {
            match m.role {
                Role::System => {
                    system = Some(match system.take() {
                        Some(existing) => format!("{}\n\n{}", existing, m.content),
                        None => m.content.clone(),
                    });
                }
                Role::User => contents.push(json!({
                    "role": "user",
                    "parts": [{ "text": m.content }]
                })),
                Role::Assistant => {
                    if !m.content.is_empty() {
                        contents.push(json!({
                            "role": "model",
                            "parts": [{ "text": m.content }]
                        }));
                    }
                }
            }
        }

        (system, contents)
    }

    /// Parse a non-streaming response
    fn parse_response(&self, response: GeminiResponse) -> LlmResult<CompletionResponse> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Parse("No candidates in response".to_string()))?;

        let text: String = candidate
            .content
            .and_then(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        let finish_reason = match candidate.finish_reason.as_deref() {
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("RECITATION") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        };

        let usage = response.usage_metadata.map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count.unwrap_or(0),
            completion_tokens: u.candidates_token_count.unwrap_or(0),
            total_tokens: u.total_token_count.unwrap_or(0),
        });

        Ok(CompletionResponse {
            message: Message::assistant(text),
            finish_reason,
            usage,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let body = self.build_request_body(&request);
        let model = request.model.as_ref().unwrap_or(&self.model);

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let response = self
            .client
            .post(&url)
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

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("Failed to parse response: {}", e)))?;

        self.parse_response(gemini_response)
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}
