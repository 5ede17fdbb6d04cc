//! # sqlreact - SQL ReAct agent
//!
//! sqlreact answers natural-language questions about a SQLite database by
//! letting a language model alternate between reasoning and read-only tool
//! calls (list tables, describe a table, run a validated `SELECT`) until it
//! produces a final answer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sqlreact::agents::{AgentConfig, AgentHandler, LlmProviderConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let handler = AgentHandler::new(AgentConfig::default(), LlmProviderConfig::default());
//!     handler.initialize("database/company.db").await?;
//!
//!     let result = handler.run_query("How many employees are there?").await?;
//!     println!("{}", result.message());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **agents**: the ReAct loop, response parser, tools, prompt and LLM clients
//! - **persistence**: read-only SQLite access, schema extraction, demo data
//! - **adapters**: HTTP handlers and rate limiting
//! - **config**: layered settings and validation

pub mod adapters;
pub mod agents;
pub mod cli;
pub mod config;
pub mod persistence;

use crate::adapters::api_handler::{self, ApiState};
use crate::adapters::health_handler::HealthHandler;
use crate::agents::AgentHandler;
use crate::config::Settings;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Creates the Axum application router with all endpoints configured.
///
/// `/health` is always public; `/init` and `/query` sit behind the optional
/// rate limiter from `settings.rate_limit`.
pub fn create_app(agent: Arc<AgentHandler>, settings: &Settings) -> Router {
    let health_handler = Arc::new(HealthHandler::new(agent.clone()));

    let public_router = Router::new().route(
        "/health",
        get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }),
    );

    let api_state = ApiState {
        agent,
        default_db_path: settings.database.path.clone(),
    };

    let mut agent_router = Router::new()
        .route("/init", post(api_handler::init_agent))
        .route("/query", post(api_handler::query_agent))
        .with_state(api_state);

    if let Some(limiter) = crate::adapters::rate_limit::limiter_for(settings.rate_limit.as_ref()) {
        agent_router = agent_router.layer(axum::middleware::from_fn_with_state(
            limiter,
            crate::adapters::rate_limit::rate_limit_middleware,
        ));
    }

    public_router.merge(agent_router).layer(
        tower_http::cors::CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}
