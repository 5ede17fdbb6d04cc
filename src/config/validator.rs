use thiserror::Error;

use crate::agents::config::{AgentConfig, LlmProviderConfig};
use crate::agents::parser::OBSERVATION_MARKER;
use crate::config::{RateLimitConfig, ServerSettings, Settings};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    /// Check every section, collecting all problems before failing
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        errors.extend(Self::validate_server(&settings.server));
        errors.extend(Self::validate_agent(&settings.agent));
        errors.extend(Self::validate_llm(&settings.llm));

        if settings.database.path.as_os_str().is_empty() {
            errors.push(ValidationError::MissingField("database.path".to_string()));
        }

        if let Some(rate_limit) = &settings.rate_limit {
            errors.extend(Self::validate_rate_limit(rate_limit));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(invalid("server.port", "Port must be greater than 0"));
        }

        errors
    }

    fn validate_agent(agent: &AgentConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if agent.max_iterations == 0 {
            errors.push(invalid("agent.max_iterations", "Must be at least 1"));
        }
        if agent.max_retries == 0 {
            errors.push(invalid("agent.max_retries", "Must be at least 1"));
        }
        if agent.retry_delay.is_zero() {
            errors.push(invalid("agent.retry_delay", "Must be positive"));
        }
        if !agent.temperature.is_finite() || agent.temperature < 0.0 {
            errors.push(invalid("agent.temperature", "Must be a non-negative number"));
        }
        if agent.model_name.trim().is_empty() {
            errors.push(ValidationError::MissingField("agent.model_name".to_string()));
        }
        if !agent.stop_sequences.iter().any(|s| s == OBSERVATION_MARKER) {
            errors.push(ValidationError::InvalidValue {
                field: "agent.stop_sequences".to_string(),
                reason: format!("Must include '{}'", OBSERVATION_MARKER),
            });
        }
        if agent.row_limit == 0 {
            errors.push(invalid("agent.row_limit", "Must be at least 1"));
        }
        if agent.display_rows == 0 {
            errors.push(invalid("agent.display_rows", "Must be at least 1"));
        }

        errors
    }

    fn validate_llm(llm: &LlmProviderConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Some(url) = &llm.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(invalid("llm.base_url", "Must be an http(s) URL"));
            }
        }
        if let Some(env) = &llm.api_key_env {
            if env.trim().is_empty() {
                errors.push(ValidationError::MissingField("llm.api_key_env".to_string()));
            }
        }
        if llm.timeout_seconds == Some(0) {
            errors.push(invalid("llm.timeout_seconds", "Must be greater than 0"));
        }

        errors
    }

    fn validate_rate_limit(rate_limit: &RateLimitConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if rate_limit.enabled {
            if rate_limit.requests_per_second == 0 {
                errors.push(invalid("rate_limit.requests_per_second", "Must be greater than 0"));
            }
            if rate_limit.burst_size == 0 {
                errors.push(invalid("rate_limit.burst_size", "Must be greater than 0"));
            }
        }

        errors
    }
}
