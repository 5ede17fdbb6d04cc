//! Per-iteration trace records and the final run envelope

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{ConversationHistory, ParsedAction};

/// Kind of iteration recorded in the trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    /// Tool call and observation
    ReactCycle,
    /// The model answered
    FinalAnswer,
    /// Unparseable response or failed model call
    Error,
}

/// One iteration of the loop, as shown to UIs and API clients
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub iteration: u32,
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub timestamp: DateTime<Utc>,
    pub thought: String,
    pub action: String,
    pub action_params: Map<String, Value>,
    pub observation: String,
    pub raw_response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
}

impl StepRecord {
    fn new(iteration: u32, kind: StepKind, raw_response: impl Into<String>) -> Self {
        Self {
            iteration,
            kind,
            timestamp: Utc::now(),
            thought: String::new(),
            action: String::new(),
            action_params: Map::new(),
            observation: String::new(),
            raw_response: raw_response.into(),
            final_answer: None,
        }
    }

    pub fn react_cycle(
        iteration: u32,
        raw_response: impl Into<String>,
        action: &ParsedAction,
        observation: impl Into<String>,
    ) -> Self {
        let mut step = Self::new(iteration, StepKind::ReactCycle, raw_response);
        step.thought = action.thought.clone().unwrap_or_default();
        step.action = action.tool_name.clone();
        step.action_params = action.params.clone();
        step.observation = observation.into();
        step
    }

    pub fn final_answer(iteration: u32, raw_response: impl Into<String>, answer: impl Into<String>) -> Self {
        let mut step = Self::new(iteration, StepKind::FinalAnswer, raw_response);
        step.final_answer = Some(answer.into());
        step
    }

    pub fn error(iteration: u32, raw_response: impl Into<String>, observation: impl Into<String>) -> Self {
        let mut step = Self::new(iteration, StepKind::Error, raw_response);
        step.observation = observation.into();
        step
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    MaxIterations,
    Error,
}

/// Outcome of one agent run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub steps: Vec<StepRecord>,
    pub iterations: u32,
    pub status: RunStatus,
    /// Full conversation, kept for audit; not part of the wire envelope
    #[serde(skip)]
    pub history: ConversationHistory,
}

impl RunResult {
    /// Answer, diagnostic, or error text, whichever the run produced
    pub fn message(&self) -> &str {
        self.final_answer
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or_default()
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_record_wire_names() {
        let action = ParsedAction::new("list_tables", Map::new()).with_thought("look around");
        let step = StepRecord::react_cycle(1, "raw", &action, "Tables in database: a");
        let json = serde_json::to_value(&step).unwrap();

        assert_eq!(json["type"], "REACT_CYCLE");
        assert_eq!(json["action"], "list_tables");
        assert_eq!(json["thought"], "look around");
        assert_eq!(json["raw_response"], "raw");
        assert!(json.get("final_answer").is_none());
    }

    #[test]
    fn test_run_result_envelope() {
        let result = RunResult {
            run_id: "r1".to_string(),
            final_answer: Some("There are 8 employees.".to_string()),
            error: None,
            steps: vec![StepRecord::final_answer(1, "FINAL ANSWER: 8", "There are 8 employees.")],
            iterations: 1,
            status: RunStatus::Success,
            history: ConversationHistory::default(),
        };
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["steps"][0]["type"], "FINAL_ANSWER");
        assert!(json.get("error").is_none());
        assert!(json.get("history").is_none());
        assert_eq!(result.message(), "There are 8 employees.");
    }
}
