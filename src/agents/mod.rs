//! SQL question-answering agent
//!
//! ## Architecture
//!
//! - `domain/` - Core types (Message, ConversationHistory, StepRecord, RunResult)
//! - `parser` - Extraction of actions and final answers from model text
//! - `tools/` - Database tools and read-only SQL validation
//! - `prompt` - System prompt rendering
//! - `llm/` - LLM providers and the pacing/retrying client
//! - `core/` - The ReAct loop
//! - `handler` - Per-request agent construction for the API and CLI

pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod handler;
pub mod llm;
pub mod parser;
pub mod prompt;
pub mod tools;

// Re-export commonly used types
pub use config::*;
pub use domain::*;
pub use error::*;
pub use handler::{AgentHandler, InitReport};
