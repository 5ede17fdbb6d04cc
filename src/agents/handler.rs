//! Agent handler shared by the HTTP API and the CLI
//!
//! The handler remembers only which database was initialized and which
//! provider to use. Every question gets a freshly built agent with its own
//! connection and its own paced client, so concurrent requests never share
//! run state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::agents::config::{AgentConfig, LlmProviderConfig};
use crate::agents::core::SqlReActAgent;
use crate::agents::domain::RunResult;
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::llm::{create_provider, LlmProvider};
use crate::persistence::{DatabaseTarget, SchemaCatalog};

/// What `/init` reports back
#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub db_path: PathBuf,
    /// Rendered schema block, as placed in the system prompt
    pub schema: String,
}

struct Initialized {
    target: DatabaseTarget,
    provider: Arc<dyn LlmProvider>,
}

/// Handler for agent operations
pub struct AgentHandler {
    agent_config: AgentConfig,
    llm_config: LlmProviderConfig,
    provider: Option<Arc<dyn LlmProvider>>,
    state: RwLock<Option<Initialized>>,
}

impl AgentHandler {
    /// Create a handler that builds its provider from configuration on init
    pub fn new(agent_config: AgentConfig, llm_config: LlmProviderConfig) -> Self {
        Self {
            agent_config,
            llm_config,
            provider: None,
            state: RwLock::new(None),
        }
    }

    /// Create a handler with an already constructed provider
    pub fn with_provider(agent_config: AgentConfig, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            agent_config,
            llm_config: LlmProviderConfig::default(),
            provider: Some(provider),
            state: RwLock::new(None),
        }
    }

    pub fn agent_config(&self) -> &AgentConfig {
        &self.agent_config
    }

    /// Whether a database has been initialized
    pub async fn is_ready(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Path of the initialized database, if any
    pub async fn db_path(&self) -> Option<PathBuf> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|s| s.target.path().to_path_buf())
    }

    /// Point the handler at a database, checking it can be opened and read
    pub async fn initialize(&self, db_path: impl AsRef<Path>) -> AgentResult<InitReport> {
        self.agent_config.validate()?;

        let target = DatabaseTarget::new(db_path.as_ref())?;
        let mut conn = target.connect_read_only().await?;
        let schema = SchemaCatalog::extract(&mut conn).await?;

        let provider = match &self.provider {
            Some(provider) => provider.clone(),
            None => create_provider(&self.llm_config, &self.agent_config.model_name)?,
        };

        tracing::info!(
            "Initialized agent for {} ({} tables)",
            target.path().display(),
            schema.tables.len()
        );

        let report = InitReport {
            db_path: target.path().to_path_buf(),
            schema: schema.to_string(),
        };
        *self.state.write().await = Some(Initialized { target, provider });
        Ok(report)
    }

    /// Build a fresh agent for the initialized database
    pub async fn build_agent(&self) -> AgentResult<SqlReActAgent> {
        let (target, provider) = {
            let state = self.state.read().await;
            let initialized = state.as_ref().ok_or(AgentError::NotInitialized)?;
            (initialized.target.clone(), initialized.provider.clone())
        };

        SqlReActAgent::build(self.agent_config.clone(), provider, &target).await
    }

    /// Answer one question against the initialized database
    pub async fn run_query(&self, question: &str) -> AgentResult<RunResult> {
        let mut agent = self.build_agent().await?;
        Ok(agent.run(question).await)
    }
}
