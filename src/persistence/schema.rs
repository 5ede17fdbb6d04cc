//! Schema introspection for SQLite databases
//!
//! The catalog is extracted once per agent and rendered into the system
//! prompt; the table helpers back the `list_tables` and `describe_table` tools.

use std::fmt;

use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

use crate::persistence::error::PersistenceError;

/// A single column as reported by `PRAGMA table_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

/// Columns and row count of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub row_count: i64,
    pub columns: Vec<ColumnInfo>,
}

/// Quote an identifier for interpolation into SQL text
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Names of all user tables, sorted
pub async fn list_table_names(conn: &mut SqliteConnection) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&mut *conn)
    .await
}

/// Whether a user table with this exact name exists
pub async fn table_exists(conn: &mut SqliteConnection, name: &str) -> Result<bool, sqlx::Error> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(found.is_some())
}

/// Read column metadata and row count for a table known to exist
pub async fn describe_table(conn: &mut SqliteConnection, name: &str) -> Result<TableInfo, sqlx::Error> {
    let quoted = quote_identifier(name);

    let rows = sqlx::query(&format!("PRAGMA table_info({})", quoted))
        .fetch_all(&mut *conn)
        .await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        columns.push(ColumnInfo {
            name: row.try_get("name")?,
            data_type: row.try_get("type")?,
            not_null: row.try_get::<i64, _>("notnull")? != 0,
            primary_key: row.try_get::<i64, _>("pk")? != 0,
        });
    }

    let row_count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quoted))
        .fetch_one(&mut *conn)
        .await?;

    Ok(TableInfo {
        name: name.to_string(),
        row_count,
        columns,
    })
}

/// Full description of every table in a database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaCatalog {
    pub tables: Vec<TableInfo>,
}

impl SchemaCatalog {
    /// Introspect all user tables on the given connection
    pub async fn extract(conn: &mut SqliteConnection) -> Result<Self, PersistenceError> {
        let names = list_table_names(conn)
            .await
            .map_err(|e| PersistenceError::Schema(e.to_string()))?;

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let table = describe_table(conn, &name)
                .await
                .map_err(|e| PersistenceError::Schema(format!("{}: {}", name, e)))?;
            tables.push(table);
        }

        tracing::debug!("Extracted schema for {} tables", tables.len());
        Ok(Self { tables })
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }
}

impl fmt::Display for SchemaCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DATABASE SCHEMA:")?;
        writeln!(f)?;

        for table in &self.tables {
            writeln!(f, "Table: {} ({} rows)", table.name, table.row_count)?;

            let columns: Vec<String> = table
                .columns
                .iter()
                .map(|col| {
                    let mut constraints = Vec::new();
                    if col.primary_key {
                        constraints.push("PK");
                    }
                    if col.not_null {
                        constraints.push("NOT NULL");
                    }
                    if constraints.is_empty() {
                        format!("{} ({})", col.name, col.data_type)
                    } else {
                        format!("{} ({}) [{}]", col.name, col.data_type, constraints.join(", "))
                    }
                })
                .collect();

            writeln!(f, "  Columns: {}", columns.join(", "))?;
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sample::seed_company_tables;
    use sqlx::Connection;

    async fn company() -> SqliteConnection {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        seed_company_tables(&mut conn).await.unwrap();
        conn
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("employees"), "\"employees\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[tokio::test]
    async fn test_extract_catalog() {
        let mut conn = company().await;
        let catalog = SchemaCatalog::extract(&mut conn).await.unwrap();

        let names: Vec<&str> = catalog.table_names().collect();
        assert_eq!(names, vec!["departments", "employees"]);

        let employees = &catalog.tables[1];
        assert_eq!(employees.row_count, 8);
        let id = employees.columns.iter().find(|c| c.name == "id").unwrap();
        assert!(id.primary_key);
        assert_eq!(id.data_type, "INTEGER");
    }

    #[tokio::test]
    async fn test_render_catalog() {
        let mut conn = company().await;
        let rendered = SchemaCatalog::extract(&mut conn).await.unwrap().to_string();

        assert!(rendered.starts_with("DATABASE SCHEMA:"));
        assert!(rendered.contains("Table: employees (8 rows)"));
        assert!(rendered.contains("Table: departments (3 rows)"));
        assert!(rendered.contains("id (INTEGER) [PK]"));
        assert!(rendered.contains("name (TEXT) [NOT NULL]"));
    }

    #[tokio::test]
    async fn test_table_exists() {
        let mut conn = company().await;
        assert!(table_exists(&mut conn, "employees").await.unwrap());
        assert!(!table_exists(&mut conn, "ghosts").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_database_has_no_tables() {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        assert!(list_table_names(&mut conn).await.unwrap().is_empty());
        let catalog = SchemaCatalog::extract(&mut conn).await.unwrap();
        assert!(catalog.tables.is_empty());
    }
}
