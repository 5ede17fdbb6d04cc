//! ReAct agent implementation (Reasoning + Acting) over a SQLite database

use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;
use uuid::Uuid;

use crate::agents::config::AgentConfig;
use crate::agents::domain::{ConversationHistory, Message, RunResult, RunStatus, StepRecord};
use crate::agents::error::AgentResult;
use crate::agents::llm::{LlmProvider, ResilientLlmClient};
use crate::agents::parser::{parse_response, ParseOutcome, OBSERVATION_MARKER};
use crate::agents::prompt::build_system_prompt;
use crate::agents::tools::DatabaseTools;
use crate::persistence::{DatabaseTarget, SchemaCatalog};

/// Sent back to the model when a response has neither an action nor an answer
pub const CORRECTION_MESSAGE: &str = "Error: Expected ACTION or FINAL ANSWER. Please provide one.";

/// ReAct agent: Thought → Action → Observation until a final answer
pub struct SqlReActAgent {
    config: AgentConfig,
    client: ResilientLlmClient,
    tools: DatabaseTools,
    system_prompt: String,
}

impl SqlReActAgent {
    /// Assemble an agent from its parts; the configuration is validated here
    pub fn new(
        config: AgentConfig,
        client: ResilientLlmClient,
        tools: DatabaseTools,
        system_prompt: String,
    ) -> AgentResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            client,
            tools,
            system_prompt,
        })
    }

    /// Open the database, extract its schema and build the system prompt
    pub async fn build(
        config: AgentConfig,
        provider: Arc<dyn LlmProvider>,
        target: &DatabaseTarget,
    ) -> AgentResult<Self> {
        config.validate()?;

        let mut conn = target.connect_read_only().await?;
        let schema = SchemaCatalog::extract(&mut conn).await?;
        let system_prompt = build_system_prompt(&schema, config.include_examples)?;

        tracing::debug!(
            "Built agent for {} ({} tables)",
            target.path().display(),
            schema.tables.len()
        );

        let client = ResilientLlmClient::new(provider, &config);
        let tools = DatabaseTools::new(conn, config.row_limit, config.display_rows);
        Self::new(config, client, tools, system_prompt)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Answer one question; always returns a structured result
    pub async fn run(&mut self, question: &str) -> RunResult {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("react_run", run_id = %run_id);
        self.run_loop(run_id, question).instrument(span).await
    }

    async fn run_loop(&mut self, run_id: String, question: &str) -> RunResult {
        let start_time = Instant::now();
        let max_iterations = self.config.max_iterations;

        tracing::info!("Starting ReAct loop for question: {}", question);

        let mut history = ConversationHistory::new(self.system_prompt.clone(), question);
        let mut steps = Vec::new();
        let mut last_response = String::new();

        for iteration in 1..=max_iterations {
            tracing::debug!("Iteration {}/{}", iteration, max_iterations);

            let response = match self.client.complete(&history).await {
                Ok(response) => response,
                Err(e) => {
                    let message = format!("LLM call failed: {}", e);
                    tracing::error!("{}", message);
                    steps.push(StepRecord::error(iteration, "", message.clone()));
                    return RunResult {
                        run_id,
                        final_answer: None,
                        error: Some(message),
                        steps,
                        iterations: iteration,
                        status: RunStatus::Error,
                        history,
                    };
                }
            };

            history.push(Message::assistant(response.clone()));

            match parse_response(&response) {
                ParseOutcome::Final(answer) => {
                    tracing::info!(
                        "Final answer after {} iterations in {:?}",
                        iteration,
                        start_time.elapsed()
                    );
                    steps.push(StepRecord::final_answer(iteration, response, answer.text.clone()));
                    return RunResult {
                        run_id,
                        final_answer: Some(answer.text),
                        error: None,
                        steps,
                        iterations: iteration,
                        status: RunStatus::Success,
                        history,
                    };
                }
                ParseOutcome::NoAction(failure) => {
                    tracing::warn!("No valid action in response: {}", failure);
                    let correction = match failure.feedback() {
                        Some(detail) => format!("{}\nDetail: {}", CORRECTION_MESSAGE, detail),
                        None => CORRECTION_MESSAGE.to_string(),
                    };
                    history.push(Message::user(correction.clone()));
                    steps.push(StepRecord::error(iteration, response.clone(), correction));
                }
                ParseOutcome::Action(action) => {
                    tracing::info!("Action: {} {}", action.tool_name, serde_json::Value::Object(action.params.clone()));
                    let observation = self.tools.dispatch(&action.tool_name, &action.params).await;
                    tracing::debug!("Observation: {}", observation);

                    history.push(Message::user(format!("{} {}", OBSERVATION_MARKER, observation)));
                    steps.push(StepRecord::react_cycle(iteration, response.clone(), &action, observation));
                }
            }

            last_response = response;
        }

        tracing::warn!("Reached maximum iterations ({})", max_iterations);
        RunResult {
            run_id,
            final_answer: Some(format!(
                "Agent stopped: Reached maximum iterations ({}). Last response:\n\n{}",
                max_iterations, last_response
            )),
            error: None,
            steps,
            iterations: max_iterations,
            status: RunStatus::MaxIterations,
            history,
        }
    }
}
