//! Rate-limited, retrying wrapper around an [`LlmProvider`]
//!
//! Every attempt is paced so that two provider calls of one client are at
//! least `min_delay_between_calls` apart. Failed attempts are retried with
//! exponential backoff (`retry_delay * 2^(k-2)` before attempt `k`) unless the
//! failure signals an exhausted quota, which no amount of waiting will fix.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use super::{CompletionRequest, LlmProvider};
use crate::agents::config::AgentConfig;
use crate::agents::domain::ConversationHistory;
use crate::agents::error::{LlmError, LlmResult};

const QUOTA_MARKERS: &[&str] = &[
    "daily limit",
    "quota exceeded",
    "daily quota",
    "rate_limit_exceeded",
    "resource_exhausted",
];

const THROTTLE_MARKERS: &[&str] = &["rate limit", "too many requests", "requests per minute"];

/// How a provider failure should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Account or daily quota is gone; fail immediately
    Quota,
    /// Short-term throttling; retry
    Throttled,
    /// Anything else; retry, then surface the error as is
    Other,
}

/// Classify a failure by its type and (case-insensitively) its message
pub fn classify_failure(err: &LlmError) -> FailureClass {
    if matches!(err, LlmError::QuotaExhausted(_)) {
        return FailureClass::Quota;
    }

    let message = err.to_string().to_lowercase();
    if QUOTA_MARKERS.iter().any(|m| message.contains(m)) {
        return FailureClass::Quota;
    }

    let throttled = matches!(err, LlmError::RateLimited | LlmError::Api { status: 429, .. })
        || THROTTLE_MARKERS.iter().any(|m| message.contains(m));
    if throttled {
        FailureClass::Throttled
    } else {
        FailureClass::Other
    }
}

/// Backoff before attempt `attempt` (1-based); the first attempt has none
pub fn retry_delay_for(base: Duration, attempt: u32) -> Duration {
    if attempt <= 1 {
        return Duration::ZERO;
    }
    let factor = 1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

/// Enforces a minimum gap between successive calls
#[derive(Debug, Clone)]
pub struct CallPacer {
    min_interval: Duration,
    last_call: Option<Instant>,
}

impl CallPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: None,
        }
    }

    /// Time left before the next call may start
    pub fn remaining(&self) -> Duration {
        match self.last_call {
            Some(last) => self.min_interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Sleep until the minimum interval since the last call has passed
    pub async fn wait(&self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            tracing::info!("Rate limiting: waiting {:.1}s before next call", remaining.as_secs_f64());
            sleep(remaining).await;
        }
    }

    /// Record that a call is starting now
    pub fn mark(&mut self) {
        self.last_call = Some(Instant::now());
    }

    pub fn last_call(&self) -> Option<Instant> {
        self.last_call
    }
}

/// Provider wrapper owned by one agent run
pub struct ResilientLlmClient {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    stop: Vec<String>,
    max_retries: u32,
    retry_delay: Duration,
    pacer: CallPacer,
}

impl ResilientLlmClient {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig) -> Self {
        Self {
            provider,
            model: config.model_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stop: config.stop_sequences.clone(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            pacer: CallPacer::new(config.min_delay_between_calls),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn pacer(&self) -> &CallPacer {
        &self.pacer
    }

    /// Send the whole history and return the assistant's text
    pub async fn complete(&mut self, history: &ConversationHistory) -> LlmResult<String> {
        let request = CompletionRequest {
            messages: history.messages().to_vec(),
            model: Some(self.model.clone()),
            temperature: Some(self.temperature),
            max_tokens: self.max_tokens,
            stop: Some(self.stop.clone()),
        };

        for attempt in 1..=self.max_retries {
            if attempt > 1 {
                let backoff = retry_delay_for(self.retry_delay, attempt);
                tracing::info!(
                    "Retrying in {:.1}s (attempt {}/{})",
                    backoff.as_secs_f64(),
                    attempt,
                    self.max_retries
                );
                sleep(backoff).await;
            }

            self.pacer.wait().await;
            self.pacer.mark();

            tracing::debug!(
                "Calling {} with {} messages (attempt {})",
                self.provider.name(),
                request.messages.len(),
                attempt
            );

            let err = match self.provider.complete(request.clone()).await {
                Ok(response) => return Ok(response.message.content),
                Err(err) => err,
            };

            let exhausted = attempt == self.max_retries;
            match classify_failure(&err) {
                FailureClass::Quota => {
                    tracing::error!("Quota exhausted: {}", err);
                    return Err(match err {
                        LlmError::QuotaExhausted(msg) => LlmError::QuotaExhausted(msg),
                        other => LlmError::QuotaExhausted(other.to_string()),
                    });
                }
                FailureClass::Throttled => {
                    tracing::warn!("Rate limited on attempt {}: {}", attempt, err);
                    if exhausted {
                        return Err(LlmError::RateLimitPersisted {
                            retries: self.max_retries,
                        });
                    }
                }
                FailureClass::Other => {
                    tracing::warn!("LLM call failed on attempt {}: {}", attempt, err);
                    if exhausted {
                        return Err(err);
                    }
                }
            }
        }

        Err(LlmError::InvalidRequest(
            "max_retries must be at least 1".to_string(),
        ))
    }
}
