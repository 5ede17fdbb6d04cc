//! What the agent extracted from one assistant message

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedAction {
    /// Tool name as written after `ACTION:`
    pub tool_name: String,
    /// Parameter object following the tool name
    pub params: Map<String, Value>,
    /// Reasoning between `THOUGHT:` and `ACTION:`, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
}

impl ParsedAction {
    pub fn new(tool_name: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            params,
            thought: None,
        }
    }

    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }
}

/// The model's answer to the user's question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalAnswer {
    pub text: String,
}
