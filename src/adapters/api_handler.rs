//! REST handlers for initializing the agent and asking questions

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use crate::agents::{AgentError, AgentHandler};

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<AgentHandler>,
    /// Database opened by `/init` when the request names none
    pub default_db_path: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
pub struct InitRequest {
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// POST /init
pub async fn init_agent(
    State(state): State<ApiState>,
    body: Option<Json<InitRequest>>,
) -> Response {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let db_path = request.db_path.unwrap_or_else(|| state.default_db_path.clone());

    match state.agent.initialize(&db_path).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "status": "initialized",
                "db_path": report.db_path.display().to_string(),
                "schema": report.schema,
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to initialize agent for {}: {}", db_path.display(), e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /query
pub async fn query_agent(
    State(state): State<ApiState>,
    body: Option<Json<QueryRequest>>,
) -> Response {
    if !state.agent.is_ready().await {
        return error_response(StatusCode::BAD_REQUEST, AgentError::NotInitialized.to_string());
    }

    let question = match body.and_then(|Json(r)| r.query).filter(|q| !q.is_empty()) {
        Some(question) => question,
        None => return error_response(StatusCode::BAD_REQUEST, "No query provided"),
    };

    match state.agent.run_query(&question).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(AgentError::NotInitialized) => {
            error_response(StatusCode::BAD_REQUEST, AgentError::NotInitialized.to_string())
        }
        Err(e) => {
            tracing::error!("Query failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": e.to_string(),
                    "final_answer": format!("Error: {}", e),
                    "steps": [],
                })),
            )
                .into_response()
        }
    }
}
