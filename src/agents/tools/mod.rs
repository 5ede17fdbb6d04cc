//! Database tools the agent can call
//!
//! The tool set is closed: `list_tables`, `describe_table` and
//! `query_database`. Any other name resolves to an unknown-tool observation.
//! Dispatch never fails; every error is rendered as text for the model.

pub mod validator;

use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::agents::error::{ToolError, ToolResult};
use crate::persistence::schema;

/// Names of every tool, in prompt order
pub const TOOL_NAMES: [&str; 3] = ["list_tables", "describe_table", "query_database"];

/// A resolved tool call with its typed arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    ListTables,
    DescribeTable { table_name: String },
    QueryDatabase { query: String },
}

impl Tool {
    /// Resolve a tool name and its JSON parameters
    pub fn from_call(name: &str, params: &Map<String, Value>) -> ToolResult<Self> {
        match name {
            "list_tables" => Ok(Tool::ListTables),
            "describe_table" => Ok(Tool::DescribeTable {
                table_name: string_param(name, params, "table_name")?,
            }),
            "query_database" => Ok(Tool::QueryDatabase {
                query: string_param(name, params, "query")?,
            }),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tool::ListTables => "list_tables",
            Tool::DescribeTable { .. } => "describe_table",
            Tool::QueryDatabase { .. } => "query_database",
        }
    }
}

fn string_param(tool: &str, params: &Map<String, Value>, key: &str) -> ToolResult<String> {
    match params.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ToolError::InvalidParameter {
            tool: tool.to_string(),
            parameter: key.to_string(),
        }),
        None => Err(ToolError::MissingParameter {
            tool: tool.to_string(),
            parameter: key.to_string(),
        }),
    }
}

/// Prompt-facing description of a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// Parameter name and type label pairs
    pub param_schema: Vec<(&'static str, &'static str)>,
}

impl ToolDescriptor {
    /// `name(param (type)): description`
    pub fn to_prompt_string(&self) -> String {
        let params: Vec<String> = self
            .param_schema
            .iter()
            .map(|(name, ty)| format!("{} ({})", name, ty))
            .collect();
        format!("{}({}): {}", self.name, params.join(", "), self.description)
    }
}

/// Descriptors for the whole tool set
pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "list_tables",
            description: "Lists all tables in the database. No parameters required.",
            param_schema: vec![],
        },
        ToolDescriptor {
            name: "describe_table",
            description: "Describes the schema of a specific table including columns, types, and row count.",
            param_schema: vec![("table_name", "str")],
        },
        ToolDescriptor {
            name: "query_database",
            description: "Executes a read-only SELECT query on the database. Only SELECT queries allowed.",
            param_schema: vec![("query", "str")],
        },
    ]
}

/// Numbered tool block for the system prompt
pub fn render_tool_block(tools: &[ToolDescriptor]) -> String {
    tools
        .iter()
        .enumerate()
        .map(|(i, tool)| format!("{}. {}", i + 1, tool.to_prompt_string()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Tool executor bound to one database connection
pub struct DatabaseTools {
    conn: SqliteConnection,
    row_limit: u32,
    display_rows: usize,
}

impl DatabaseTools {
    pub fn new(conn: SqliteConnection, row_limit: u32, display_rows: usize) -> Self {
        Self {
            conn,
            row_limit,
            display_rows,
        }
    }

    /// Run a tool call and return the observation text
    pub async fn dispatch(&mut self, name: &str, params: &Map<String, Value>) -> String {
        let tool = match Tool::from_call(name, params) {
            Ok(tool) => tool,
            Err(ToolError::UnknownTool(unknown)) => {
                tracing::warn!("Model requested unknown tool '{}'", unknown);
                return format!(
                    "Error: Unknown tool: {}. Available tools: {}",
                    unknown,
                    TOOL_NAMES.join(", ")
                );
            }
            Err(e) => return format!("Tool execution error: {}", e),
        };

        tracing::debug!("Executing tool {}", tool.name());
        self.execute(tool).await
    }

    /// Execute an already resolved tool
    pub async fn execute(&mut self, tool: Tool) -> String {
        match tool {
            Tool::ListTables => self
                .list_tables()
                .await
                .unwrap_or_else(|e| format!("Error listing tables: {}", e)),
            Tool::DescribeTable { table_name } => match self.describe_table(&table_name).await {
                Ok(text) => text,
                Err(ToolError::Database(e)) => format!("Error describing table: {}", e),
                Err(e) => format!("Error: {}", e),
            },
            Tool::QueryDatabase { query } => self.query_database(&query).await,
        }
    }

    async fn list_tables(&mut self) -> ToolResult<String> {
        let names = schema::list_table_names(&mut self.conn).await?;
        if names.is_empty() {
            return Ok("No tables found in database.".to_string());
        }
        Ok(format!("Tables in database: {}", names.join(", ")))
    }

    async fn describe_table(&mut self, table_name: &str) -> ToolResult<String> {
        let table_name = validator::sanitize_identifier(table_name)?;

        if !schema::table_exists(&mut self.conn, table_name).await? {
            return Ok(format!("Error: Table '{}' does not exist.", table_name));
        }

        let info = schema::describe_table(&mut self.conn, table_name).await?;

        let mut lines = vec![
            format!("Table: {}", info.name),
            format!("Row count: {}", info.row_count),
            "Columns:".to_string(),
        ];
        for col in &info.columns {
            let not_null = if col.not_null { " NOT NULL" } else { "" };
            let pk = if col.primary_key { " PRIMARY KEY" } else { "" };
            lines.push(format!("  - {} ({}){}{}", col.name, col.data_type, not_null, pk));
        }
        Ok(lines.join("\n"))
    }

    async fn query_database(&mut self, query: &str) -> String {
        if let Err(failure) = validator::validate(query, &mut self.conn).await {
            tracing::info!("Rejected query: {}", failure);
            return format!("Query validation failed: {}", failure);
        }

        let limited = validator::add_limit(query, self.row_limit);
        tracing::debug!("Executing query: {}", limited);

        match sqlx::query(&limited).fetch_all(&mut self.conn).await {
            Ok(rows) => format_rows(&rows, self.display_rows),
            Err(e) => format!("Database error: {}", e),
        }
    }
}

/// Render a result set as a ` | `-delimited table, showing at most `display_rows`
pub fn format_rows(rows: &[SqliteRow], display_rows: usize) -> String {
    let Some(first) = rows.first() else {
        return "Query executed successfully but returned no results.".to_string();
    };

    let header = first
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect::<Vec<_>>()
        .join(" | ");

    let rule = "-".repeat(header.chars().count());
    let mut lines = vec![
        format!("Query returned {} row(s):", rows.len()),
        String::new(),
        header,
        rule,
    ];

    let shown = rows.len().min(display_rows);
    for row in &rows[..shown] {
        let values: Vec<String> = (0..row.len()).map(|i| format_value(row, i)).collect();
        lines.push(values.join(" | "));
    }

    if rows.len() > shown {
        lines.push(format!("... ({} more rows not shown)", rows.len() - shown));
    }

    lines.join("\n")
}

fn format_value(row: &SqliteRow, index: usize) -> String {
    let raw = match row.try_get_raw(index) {
        Ok(raw) => raw,
        Err(e) => return format!("<{}>", e),
    };
    if raw.is_null() {
        return "NULL".to_string();
    }
    let type_name = raw.type_info().name().to_string();

    let rendered = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => row.try_get_unchecked::<i64, _>(index).map(|v| v.to_string()),
        "REAL" => row.try_get_unchecked::<f64, _>(index).map(|v| format!("{:?}", v)),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(|v| format!("<{} bytes>", v.len())),
        _ => row.try_get_unchecked::<String, _>(index),
    };

    rendered.unwrap_or_else(|e| format!("<{}>", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sample::seed_company_tables;
    use serde_json::json;
    use sqlx::Connection;

    async fn tools() -> DatabaseTools {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        seed_company_tables(&mut conn).await.unwrap();
        DatabaseTools::new(conn, 100, 20)
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_tool_resolution() {
        assert_eq!(Tool::from_call("list_tables", &Map::new()).unwrap(), Tool::ListTables);
        assert_eq!(
            Tool::from_call("describe_table", &params(json!({"table_name": "employees"}))).unwrap(),
            Tool::DescribeTable {
                table_name: "employees".to_string()
            }
        );
        assert!(matches!(
            Tool::from_call("query_database", &Map::new()),
            Err(ToolError::MissingParameter { .. })
        ));
        assert!(matches!(
            Tool::from_call("query_database", &params(json!({"query": 5}))),
            Err(ToolError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Tool::from_call("drop_everything", &Map::new()),
            Err(ToolError::UnknownTool(_))
        ));
    }

    #[test]
    fn test_tool_block() {
        let block = render_tool_block(&descriptors());
        assert!(block.starts_with("1. list_tables(): Lists all tables"));
        assert!(block.contains("\n\n2. describe_table(table_name (str)): "));
        assert!(block.contains("3. query_database(query (str)): "));
    }

    #[tokio::test]
    async fn test_list_tables() {
        let mut tools = tools().await;
        assert_eq!(
            tools.dispatch("list_tables", &Map::new()).await,
            "Tables in database: departments, employees"
        );
    }

    #[tokio::test]
    async fn test_list_tables_empty() {
        let conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        let mut tools = DatabaseTools::new(conn, 100, 20);
        assert_eq!(
            tools.dispatch("list_tables", &Map::new()).await,
            "No tables found in database."
        );
    }

    #[tokio::test]
    async fn test_describe_table() {
        let mut tools = tools().await;
        let text = tools
            .dispatch("describe_table", &params(json!({"table_name": "departments"})))
            .await;

        assert_eq!(
            text,
            "Table: departments\nRow count: 3\nColumns:\n  - id (INTEGER) PRIMARY KEY\n  - name (TEXT) NOT NULL\n  - location (TEXT)"
        );
    }

    #[tokio::test]
    async fn test_describe_missing_and_invalid_table() {
        let mut tools = tools().await;
        assert_eq!(
            tools.dispatch("describe_table", &params(json!({"table_name": "ghosts"}))).await,
            "Error: Table 'ghosts' does not exist."
        );
        let invalid = tools
            .dispatch("describe_table", &params(json!({"table_name": "x; DROP TABLE y"})))
            .await;
        assert!(invalid.starts_with("Error: Invalid identifier 'x; DROP TABLE y'"));
    }

    #[tokio::test]
    async fn test_query_formats_rows() {
        let mut tools = tools().await;
        let text = tools
            .dispatch(
                "query_database",
                &params(json!({"query": "SELECT name, salary FROM employees WHERE department_id = 1 ORDER BY id"})),
            )
            .await;

        assert_eq!(
            text,
            "Query returned 3 row(s):\n\nname | salary\n-------------\nAlice Johnson | 95000.0\nBob Smith | 87000.0\nCarol White | 110000.0"
        );
    }

    #[tokio::test]
    async fn test_query_count() {
        let mut tools = tools().await;
        let text = tools
            .dispatch(
                "query_database",
                &params(json!({"query": "SELECT COUNT(*) as count FROM employees"})),
            )
            .await;
        assert_eq!(text, "Query returned 1 row(s):\n\ncount\n-----\n8");
    }

    #[tokio::test]
    async fn test_query_truncates_display() {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        seed_company_tables(&mut conn).await.unwrap();
        let mut tools = DatabaseTools::new(conn, 100, 5);

        let text = tools
            .dispatch("query_database", &params(json!({"query": "SELECT id FROM employees"})))
            .await;
        assert!(text.starts_with("Query returned 8 row(s):"));
        assert!(text.ends_with("... (3 more rows not shown)"));
    }

    #[tokio::test]
    async fn test_query_applies_row_limit() {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        seed_company_tables(&mut conn).await.unwrap();
        let mut tools = DatabaseTools::new(conn, 2, 20);

        let text = tools
            .dispatch("query_database", &params(json!({"query": "SELECT id FROM employees;"})))
            .await;
        assert!(text.starts_with("Query returned 2 row(s):"));
    }

    #[tokio::test]
    async fn test_query_empty_and_null() {
        let mut tools = tools().await;
        assert_eq!(
            tools
                .dispatch(
                    "query_database",
                    &params(json!({"query": "SELECT * FROM employees WHERE id > 100"}))
                )
                .await,
            "Query executed successfully but returned no results."
        );
        assert_eq!(
            tools
                .dispatch("query_database", &params(json!({"query": "SELECT NULL AS nothing"})))
                .await,
            "Query returned 1 row(s):\n\nnothing\n-------\nNULL"
        );
    }

    #[tokio::test]
    async fn test_query_rejections_become_observations() {
        let mut tools = tools().await;
        assert_eq!(
            tools
                .dispatch("query_database", &params(json!({"query": "DROP TABLE employees"})))
                .await,
            "Query validation failed: Only SELECT queries (including WITH/CTEs) are allowed."
        );
        let bad = tools
            .dispatch("query_database", &params(json!({"query": "SELECT * FROM ghosts"})))
            .await;
        assert!(bad.starts_with("Query validation failed: Invalid SQL syntax:"));
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_params() {
        let mut tools = tools().await;
        assert_eq!(
            tools.dispatch("drop_everything", &Map::new()).await,
            "Error: Unknown tool: drop_everything. Available tools: list_tables, describe_table, query_database"
        );
        let missing = tools.dispatch("query_database", &Map::new()).await;
        assert_eq!(
            missing,
            "Tool execution error: Missing required parameter 'query' for tool 'query_database'"
        );
    }
}
