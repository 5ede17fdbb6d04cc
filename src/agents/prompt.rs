//! System prompt construction
//!
//! The prompt is a Tera template filled with the schema catalog, the numbered
//! tool block and (optionally) worked examples of both output shapes.

use tera::{Context, Tera};

use crate::agents::error::{AgentError, AgentResult};
use crate::agents::tools::{descriptors, render_tool_block};
use crate::persistence::SchemaCatalog;

const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a SQL Database Agent that helps users query a database using natural language.

## DATABASE SCHEMA:

{{ schema }}

## AVAILABLE TOOLS:

{{ tools }}

## OUTPUT FORMAT:

CRITICAL: Each response must contain EXACTLY ONE of these:

Option 1 - Use a tool:
THOUGHT: your reasoning
ACTION: tool_name{"param": "value"}

Option 2 - Final answer:
FINAL ANSWER: your complete answer

RULES:
1. One output per turn: EITHER (THOUGHT + ACTION) OR (FINAL ANSWER)
2. NEVER generate OBSERVATION - system provides it
3. STOP after ACTION
4. ACTION format must be valid JSON: tool_name{"param": "value"}
5. Always THOUGHT first
{{ examples }}"#;

pub const FEW_SHOT_EXAMPLES: &str = r#"
## EXAMPLES:

Example 1: Simple Query

User: How many employees are in the database?

Agent:
THOUGHT: I can see the employees table. I'll count the rows.
ACTION: query_database{"query": "SELECT COUNT(*) as count FROM employees"}

OBSERVATION: Query returned 1 row(s):
count
-----
8

Agent:
FINAL ANSWER: There are 8 employees in the database.

---

Example 2: Multi-Step

User: How many people work in Engineering?

Agent:
THOUGHT: I need to find the department_id for Engineering first.
ACTION: query_database{"query": "SELECT id FROM departments WHERE name='Engineering'"}

OBSERVATION: Query returned 1 row(s):
id
--
1

Agent:
THOUGHT: Engineering has department_id=1. Now I'll count employees.
ACTION: query_database{"query": "SELECT COUNT(*) as count FROM employees WHERE department_id=1"}

OBSERVATION: Query returned 1 row(s):
count
-----
3

Agent:
FINAL ANSWER: There are 3 people working in the Engineering department.

---

Remember: Each response is EITHER (THOUGHT + ACTION) OR (FINAL ANSWER). NEVER generate OBSERVATION.

NOW IT'S YOUR TURN.
"#;

/// Render the system prompt for a database
pub fn build_system_prompt(schema: &SchemaCatalog, include_examples: bool) -> AgentResult<String> {
    let mut context = Context::new();
    context.insert("schema", &schema.to_string());
    context.insert("tools", &render_tool_block(&descriptors()));
    context.insert("examples", if include_examples { FEW_SHOT_EXAMPLES } else { "" });

    Tera::one_off(SYSTEM_PROMPT_TEMPLATE, &context, false)
        .map_err(|e| AgentError::Prompt(e.to_string()))
}
