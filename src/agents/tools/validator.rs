//! Read-only SQL validation
//!
//! Queries pass four layers in order, stopping at the first rejection:
//! statement prefix, single statement, keyword blacklist, and a dry
//! `EXPLAIN` against the live connection.

use std::sync::OnceLock;

use regex::Regex;
use sqlx::sqlite::SqliteConnection;
use thiserror::Error;

use crate::agents::error::ToolError;

/// Keywords that may never appear as whole words in a query
pub const DANGEROUS_KEYWORDS: &[&str] = &[
    "DELETE", "DROP", "INSERT", "UPDATE", "ALTER", "TRUNCATE", "EXEC", "EXECUTE", "CREATE",
    "REPLACE", "PRAGMA", "ATTACH", "DETACH",
];

const ALLOWED_PREFIXES: &[&str] = &["SELECT", "WITH"];

/// Reason a query was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("Only SELECT queries (including WITH/CTEs) are allowed.")]
    NotReadOnly,

    #[error("Multiple statements not allowed.")]
    MultipleStatements,

    #[error("Dangerous keyword '{0}' detected.")]
    DangerousKeyword(&'static str),

    #[error("Invalid SQL syntax: {0}")]
    InvalidSyntax(String),
}

fn keyword_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DANGEROUS_KEYWORDS
            .iter()
            .map(|kw| {
                let re = Regex::new(&format!(r"\b{}\b", kw)).expect("keyword pattern is valid");
                (*kw, re)
            })
            .collect()
    })
}

fn limit_pattern() -> &'static Regex {
    static LIMIT: OnceLock<Regex> = OnceLock::new();
    LIMIT.get_or_init(|| Regex::new(r"\bLIMIT\b").expect("limit pattern is valid"))
}

fn identifier_pattern() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"))
}

/// Run the static layers only (prefix, single statement, blacklist)
pub fn check_structure(query: &str) -> Result<(), ValidationFailure> {
    let trimmed = query.trim();
    let upper = trimmed.to_uppercase();

    if !ALLOWED_PREFIXES.iter().any(|prefix| upper.starts_with(prefix)) {
        return Err(ValidationFailure::NotReadOnly);
    }

    if strip_terminators(trimmed).contains(';') {
        return Err(ValidationFailure::MultipleStatements);
    }

    if let Some((keyword, _)) = keyword_patterns().iter().find(|(_, re)| re.is_match(&upper)) {
        return Err(ValidationFailure::DangerousKeyword(keyword));
    }

    Ok(())
}

/// Validate a query against all layers, including a dry run on `conn`
pub async fn validate(query: &str, conn: &mut SqliteConnection) -> Result<(), ValidationFailure> {
    check_structure(query)?;

    sqlx::query(&format!("EXPLAIN {}", query))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| ValidationFailure::InvalidSyntax(e.to_string()))?;

    tracing::debug!("Query passed validation");
    Ok(())
}

/// Append `LIMIT n` unless the query already has a LIMIT clause
pub fn add_limit(query: &str, limit: u32) -> String {
    if limit_pattern().is_match(&query.to_uppercase()) {
        return query.to_string();
    }
    format!("{} LIMIT {}", strip_terminators(query), limit)
}

/// Accept only plain identifiers, for interpolation into PRAGMA and COUNT queries
pub fn sanitize_identifier(identifier: &str) -> Result<&str, ToolError> {
    if identifier_pattern().is_match(identifier) {
        Ok(identifier)
    } else {
        Err(ToolError::InvalidIdentifier(identifier.to_string()))
    }
}

fn strip_terminators(query: &str) -> &str {
    query.trim_end().trim_end_matches(';').trim_end()
}
