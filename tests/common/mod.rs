#![allow(dead_code)]

use async_trait::async_trait;
use sqlreact::agents::llm::{CompletionRequest, CompletionResponse, LlmProvider};
use sqlreact::agents::{AgentConfig, LlmError, LlmResult};
use sqlreact::persistence::seed_company_database;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Provider that replays canned responses and records every request
pub struct ScriptedProvider {
    outcomes: Mutex<VecDeque<LlmResult<String>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: &[&str]) -> Arc<Self> {
        Self::with_outcomes(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn with_outcomes(outcomes: Vec<LlmResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answer every call with the same text
    pub fn repeating(response: &str) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(VecDeque::new()),
            fallback: Some(response.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        self.requests.lock().unwrap().push(request);
        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some(outcome) => outcome.map(CompletionResponse::text),
            None => match &self.fallback {
                Some(text) => Ok(CompletionResponse::text(text.clone())),
                None => Err(LlmError::InvalidRequest("script exhausted".to_string())),
            },
        }
    }
}

/// Agent settings without pacing so tests run instantly
pub fn fast_config() -> AgentConfig {
    AgentConfig {
        min_delay_between_calls: Duration::ZERO,
        retry_delay: Duration::from_millis(1),
        ..AgentConfig::default()
    }
}

/// Demo company database in a temporary directory
pub async fn company_db() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("company.db");
    seed_company_database(&path).await.unwrap();
    (dir, path)
}
