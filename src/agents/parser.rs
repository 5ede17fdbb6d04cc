//! Extraction of actions and final answers from raw model text
//!
//! The model answers in one of two shapes:
//!
//! ```text
//! THOUGHT: <reasoning>
//! ACTION: tool_name{"param": "value"}
//! ```
//!
//! or
//!
//! ```text
//! FINAL ANSWER: <answer>
//! ```
//!
//! Parsing runs in two stages. The marker scan locates `ACTION:` and the tool
//! identifier after it; the span scan then walks from the first `{` counting
//! brace depth (ignoring braces inside JSON string literals) to find the
//! parameter object, which may be nested and span several lines.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::agents::domain::{FinalAnswer, ParsedAction};

pub const FINAL_ANSWER_MARKER: &str = "FINAL ANSWER:";
pub const ACTION_MARKER: &str = "ACTION:";
pub const THOUGHT_MARKER: &str = "THOUGHT:";
pub const OBSERVATION_MARKER: &str = "OBSERVATION:";

/// Result of parsing one assistant message
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Final(FinalAnswer),
    Action(ParsedAction),
    NoAction(ParseFailure),
}

/// Why no action could be extracted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("no ACTION or FINAL ANSWER found")]
    MissingMarker,

    #[error("ACTION is not followed by a tool name")]
    MissingToolName,

    #[error("no '{{' after tool name '{0}'")]
    MissingOpenBrace(String),

    #[error("unbalanced braces in parameters for '{0}'")]
    UnbalancedBraces(String),

    #[error("parameters for '{tool}' are not a valid JSON object: {reason}")]
    InvalidJson { tool: String, reason: String },
}

impl ParseFailure {
    /// Detail worth showing to the model, beyond the generic format reminder
    pub fn feedback(&self) -> Option<String> {
        match self {
            ParseFailure::MissingMarker => None,
            other => Some(other.to_string()),
        }
    }
}

/// Parse a raw model response. A final answer takes precedence over an action.
pub fn parse_response(response: &str) -> ParseOutcome {
    if let Some(text) = extract_final_answer(response) {
        return ParseOutcome::Final(FinalAnswer { text });
    }

    match extract_action(response) {
        Ok(action) => ParseOutcome::Action(action),
        Err(failure) => {
            tracing::debug!("No action parsed: {}", failure);
            ParseOutcome::NoAction(failure)
        }
    }
}

/// Whether the response contains the final-answer marker, in any case
pub fn has_final_answer(response: &str) -> bool {
    find_ignore_ascii_case(response, FINAL_ANSWER_MARKER).is_some()
}

/// Everything after the final-answer marker, trimmed
pub fn extract_final_answer(response: &str) -> Option<String> {
    let start = find_ignore_ascii_case(response, FINAL_ANSWER_MARKER)?;
    Some(response[start + FINAL_ANSWER_MARKER.len()..].trim().to_string())
}

/// Extract the tool call, with its thought when one precedes it
pub fn extract_action(response: &str) -> Result<ParsedAction, ParseFailure> {
    let marker = scan_action_marker(response)?;

    let span = braced_span(response, marker.name_end).map_err(|err| match err {
        SpanError::MissingOpenBrace => ParseFailure::MissingOpenBrace(marker.tool_name.to_string()),
        SpanError::Unbalanced => ParseFailure::UnbalancedBraces(marker.tool_name.to_string()),
    })?;

    let params: Map<String, Value> =
        serde_json::from_str(&response[span]).map_err(|e| ParseFailure::InvalidJson {
            tool: marker.tool_name.to_string(),
            reason: e.to_string(),
        })?;

    let mut action = ParsedAction::new(marker.tool_name, params);
    if let Some(thought) = extract_thought(response, marker.marker_start) {
        action = action.with_thought(thought);
    }
    Ok(action)
}

/// Text between `THOUGHT:` and the given action position, trimmed
fn extract_thought(response: &str, action_start: usize) -> Option<String> {
    let before = &response[..action_start];
    let start = before.find(THOUGHT_MARKER)?;
    Some(before[start + THOUGHT_MARKER.len()..].trim().to_string())
}

/// Stage one output: where the action marker and tool name are
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MarkerScan<'a> {
    marker_start: usize,
    tool_name: &'a str,
    name_end: usize,
}

fn scan_action_marker(response: &str) -> Result<MarkerScan<'_>, ParseFailure> {
    let mut saw_marker = false;

    for (marker_start, _) in response.match_indices(ACTION_MARKER) {
        saw_marker = true;
        let after = marker_start + ACTION_MARKER.len();
        let rest = &response[after..];
        let name_start = after + (rest.len() - rest.trim_start().len());

        let name_len = response[name_start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(response.len() - name_start);

        if name_len > 0 {
            return Ok(MarkerScan {
                marker_start,
                tool_name: &response[name_start..name_start + name_len],
                name_end: name_start + name_len,
            });
        }
    }

    if saw_marker {
        Err(ParseFailure::MissingToolName)
    } else {
        Err(ParseFailure::MissingMarker)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanError {
    MissingOpenBrace,
    Unbalanced,
}

/// Stage two: byte range of the first balanced `{...}` at or after `from`
fn braced_span(text: &str, from: usize) -> Result<std::ops::Range<usize>, SpanError> {
    let open = from + text[from..].find('{').ok_or(SpanError::MissingOpenBrace)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[open..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(open..open + offset + 1);
                }
            }
            _ => {}
        }
    }

    Err(SpanError::Unbalanced)
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    // ASCII upper-casing keeps byte offsets identical to the input
    haystack.to_ascii_uppercase().find(&needle.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn action(outcome: ParseOutcome) -> ParsedAction {
        match outcome {
            ParseOutcome::Action(action) => action,
            other => panic!("expected action, got {:?}", other),
        }
    }

    fn failure(outcome: ParseOutcome) -> ParseFailure {
        match outcome {
            ParseOutcome::NoAction(failure) => failure,
            other => panic!("expected no action, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_action() {
        let parsed = action(parse_response(
            "THOUGHT: I need to count.\nACTION: query_database{\"query\": \"SELECT COUNT(*) FROM employees\"}",
        ));
        assert_eq!(parsed.tool_name, "query_database");
        assert_eq!(parsed.params["query"], json!("SELECT COUNT(*) FROM employees"));
        assert_eq!(parsed.thought.as_deref(), Some("I need to count."));
    }

    #[test]
    fn test_multiline_nested_params() {
        let response = "THOUGHT: join things\nACTION: query_database{\n  \"query\": \"SELECT 1\",\n  \"options\": {\"explain\": {\"depth\": 2}}\n}\ntrailing text";
        let parsed = action(parse_response(response));
        assert_eq!(parsed.params["options"]["explain"]["depth"], json!(2));
    }

    #[test]
    fn test_empty_params() {
        let parsed = action(parse_response("THOUGHT: Let me list tables\nACTION: list_tables{}"));
        assert_eq!(parsed.tool_name, "list_tables");
        assert!(parsed.params.is_empty());
    }

    #[test]
    fn test_braces_inside_string_literals() {
        let parsed = action(parse_response(
            r#"ACTION: query_database{"query": "SELECT '}' AS closing, '{' AS opening"}"#,
        ));
        assert_eq!(parsed.params["query"], json!("SELECT '}' AS closing, '{' AS opening"));
        assert_eq!(parsed.thought, None);
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let parsed = action(parse_response(r#"ACTION: describe_table{"table_name": "a\"}b"}"#));
        assert_eq!(parsed.params["table_name"], json!("a\"}b"));
    }

    #[test]
    fn test_missing_open_brace() {
        assert_eq!(
            failure(parse_response("ACTION: list_tables")),
            ParseFailure::MissingOpenBrace("list_tables".to_string())
        );
    }

    #[test]
    fn test_unbalanced_braces() {
        assert_eq!(
            failure(parse_response("ACTION: query_database{\"query\": {\"a\": 1}")),
            ParseFailure::UnbalancedBraces("query_database".to_string())
        );
    }

    #[test]
    fn test_invalid_json_is_recoverable() {
        let failure = failure(parse_response("ACTION: query_database{query: SELECT 1}"));
        assert!(matches!(failure, ParseFailure::InvalidJson { ref tool, .. } if tool == "query_database"));
        assert!(failure.feedback().is_some());
    }

    #[test]
    fn test_no_marker() {
        let failure = failure(parse_response("I think the answer is probably 8."));
        assert_eq!(failure, ParseFailure::MissingMarker);
        assert_eq!(failure.feedback(), None);
    }

    #[test]
    fn test_marker_without_tool_name() {
        assert_eq!(failure(parse_response("ACTION: {\"a\": 1}")), ParseFailure::MissingToolName);
    }

    #[test]
    fn test_final_answer_case_insensitive() {
        for response in [
            "FINAL ANSWER: There are 8 employees.",
            "final answer: There are 8 employees.",
            "THOUGHT: done\nFinal Answer:   There are 8 employees.  \n",
        ] {
            assert!(has_final_answer(response));
            assert_eq!(
                parse_response(response),
                ParseOutcome::Final(FinalAnswer {
                    text: "There are 8 employees.".to_string()
                })
            );
        }
    }

    #[test]
    fn test_final_answer_spans_lines() {
        let answer = extract_final_answer("FINAL ANSWER: Engineering:\n- Alice\n- Bob\n").unwrap();
        assert_eq!(answer, "Engineering:\n- Alice\n- Bob");
    }

    #[test]
    fn test_thought_only_is_not_final() {
        let response = "THOUGHT: I should look for the final answer in the employees table.";
        assert!(!has_final_answer(response));
        assert_eq!(failure(parse_response(response)), ParseFailure::MissingMarker);
    }

    #[test]
    fn test_final_answer_wins_over_action() {
        let outcome = parse_response("ACTION: list_tables{}\nFINAL ANSWER: nothing to do");
        assert!(matches!(outcome, ParseOutcome::Final(_)));
    }

    fn tool_name() -> impl Strategy<Value = String> {
        "[A-Za-z_][A-Za-z0-9_]{0,20}"
    }

    fn params() -> impl Strategy<Value = Map<String, Value>> {
        let leaf = prop_oneof![
            "[a-zA-Z0-9 {}\\[\\]\"\n]{0,24}".prop_map(Value::String),
            any::<i32>().prop_map(|n| json!(n)),
            any::<bool>().prop_map(Value::Bool),
        ];
        let value = leaf.prop_recursive(2, 8, 3, |inner| {
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..3)
                .prop_map(|m| Value::Object(m.into_iter().collect()))
        });
        prop::collection::btree_map("[a-z_]{1,10}", value, 0..5)
            .prop_map(|m| m.into_iter().collect())
    }

    proptest! {
        #[test]
        fn proptest_action_round_trip(name in tool_name(), params in params(), pretty in any::<bool>()) {
            let json = if pretty {
                serde_json::to_string_pretty(&params).unwrap()
            } else {
                serde_json::to_string(&params).unwrap()
            };
            let response = format!("THOUGHT: checking\nACTION: {}{}", name, json);

            let parsed = action(parse_response(&response));
            prop_assert_eq!(parsed.tool_name, name);
            prop_assert_eq!(parsed.params, params);
            prop_assert_eq!(parsed.thought.as_deref(), Some("checking"));
        }
    }
}
