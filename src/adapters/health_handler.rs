use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::agents::AgentHandler;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub agent_ready: bool,
    pub version: String,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

pub struct HealthHandler {
    agent: Arc<AgentHandler>,
    start_time: std::time::Instant,
}

impl HealthHandler {
    pub fn new(agent: Arc<AgentHandler>) -> Self {
        Self {
            agent,
            start_time: std::time::Instant::now(),
        }
    }

    /// Always 200 while the server runs; reports whether `/init` has succeeded
    pub async fn health(&self) -> impl IntoResponse {
        let db_path = self.agent.db_path().await;
        let status = HealthStatus {
            status: "healthy".to_string(),
            agent_ready: db_path.is_some(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            db_path: db_path.map(|p| p.display().to_string()),
        };

        (StatusCode::OK, Json(status))
    }
}
