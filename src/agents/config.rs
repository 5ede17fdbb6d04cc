//! Configuration types for the SQL agent

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agents::error::{AgentError, AgentResult};
use crate::agents::parser::OBSERVATION_MARKER;

/// Settings of one ReAct agent. Immutable once the agent is built.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Upper bound on model calls per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Sampling temperature (0 = deterministic)
    #[serde(default)]
    pub temperature: f32,
    /// Model identifier sent to the provider
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Sequences that end generation; keeps the model from inventing observations
    #[serde(default = "default_stop_sequences")]
    pub stop_sequences: Vec<String>,
    /// Minimum gap between two provider calls, in seconds
    #[serde(default = "default_min_delay", with = "duration_secs")]
    pub min_delay_between_calls: Duration,
    /// Attempts per model call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base of the exponential backoff, in seconds
    #[serde(default = "default_retry_delay", with = "duration_secs")]
    pub retry_delay: Duration,
    /// LIMIT appended to queries that have none
    #[serde(default = "default_row_limit")]
    pub row_limit: u32,
    /// Rows shown in a query observation
    #[serde(default = "default_display_rows")]
    pub display_rows: usize,
    /// Completion length cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Include worked examples in the system prompt
    #[serde(default = "default_include_examples")]
    pub include_examples: bool,
}

fn default_max_iterations() -> u32 {
    10
}

fn default_model_name() -> String {
    "meta-llama/llama-4-scout-17b-16e-instruct".to_string()
}

fn default_stop_sequences() -> Vec<String> {
    vec![
        OBSERVATION_MARKER.to_string(),
        "\nOBSERVATION".to_string(),
        "Observation:".to_string(),
    ]
}

fn default_min_delay() -> Duration {
    Duration::from_secs(20)
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_row_limit() -> u32 {
    100
}

fn default_display_rows() -> usize {
    20
}

fn default_include_examples() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            temperature: 0.0,
            model_name: default_model_name(),
            stop_sequences: default_stop_sequences(),
            min_delay_between_calls: default_min_delay(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            row_limit: default_row_limit(),
            display_rows: default_display_rows(),
            max_tokens: None,
            include_examples: default_include_examples(),
        }
    }
}

impl AgentConfig {
    /// Check value ranges; called once when an agent is built
    pub fn validate(&self) -> AgentResult<()> {
        let invalid = |msg: &str| Err(AgentError::Configuration(msg.to_string()));

        if self.max_iterations == 0 {
            return invalid("max_iterations must be at least 1");
        }
        if self.max_retries == 0 {
            return invalid("max_retries must be at least 1");
        }
        if self.retry_delay.is_zero() {
            return invalid("retry_delay must be positive");
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return invalid("temperature must be a non-negative number");
        }
        if self.model_name.trim().is_empty() {
            return invalid("model_name must not be empty");
        }
        if !self.stop_sequences.iter().any(|s| s == OBSERVATION_MARKER) {
            return Err(AgentError::Configuration(format!(
                "stop_sequences must include '{}'",
                OBSERVATION_MARKER
            )));
        }
        if self.row_limit == 0 {
            return invalid("row_limit must be at least 1");
        }
        if self.display_rows == 0 {
            return invalid("display_rows must be at least 1");
        }
        Ok(())
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct LlmProviderConfig {
    /// Provider type
    #[serde(default)]
    pub provider: LlmProviderType,
    /// Environment variable containing the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Custom base URL (for self-hosted or proxied endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Per-request HTTP timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl LlmProviderConfig {
    /// Configured key variable, or the provider's conventional one
    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }

    /// Configured base URL, or the provider's public endpoint
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    /// Groq's OpenAI-compatible endpoint
    #[default]
    Groq,
    /// OpenAI (or any compatible server)
    OpenAI,
    /// Google Gemini
    #[serde(alias = "google")]
    Gemini,
}

impl LlmProviderType {
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            LlmProviderType::Groq => "GROQ_API_KEY",
            LlmProviderType::OpenAI => "OPENAI_API_KEY",
            LlmProviderType::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProviderType::Groq => "https://api.groq.com/openai/v1",
            LlmProviderType::OpenAI => "https://api.openai.com/v1",
            LlmProviderType::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

impl std::fmt::Display for LlmProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProviderType::Groq => write!(f, "groq"),
            LlmProviderType::OpenAI => write!(f, "openai"),
            LlmProviderType::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for LlmProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "groq" => Ok(LlmProviderType::Groq),
            "openai" => Ok(LlmProviderType::OpenAI),
            "gemini" | "google" => Ok(LlmProviderType::Gemini),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// Durations written as (fractional) seconds
pub mod duration_secs {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            de::Error::custom(format!("expected a non-negative number of seconds, got {}", secs))
        })
    }
}
