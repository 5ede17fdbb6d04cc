use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::agents::config::LlmProviderType;

/// sqlreact - answer questions about a SQLite database with a ReAct agent
#[derive(Parser, Debug, Clone)]
#[command(name = "sqlreact", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "SQLREACT_CONFIG", default_value = "sqlreact.toml", global = true)]
    pub config: PathBuf,

    /// SQLite database to query
    #[arg(long, env = "SQLREACT_DATABASE", global = true)]
    pub database: Option<PathBuf>,

    /// Server host address
    #[arg(long, env = "SQLREACT_HOST", global = true)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "SQLREACT_PORT", global = true)]
    pub port: Option<u16>,

    /// LLM provider (groq, openai, gemini)
    #[arg(long, env = "SQLREACT_PROVIDER", global = true)]
    pub provider: Option<LlmProviderType>,

    /// Model identifier
    #[arg(long, env = "SQLREACT_MODEL", global = true)]
    pub model: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Ask one question and print the answer
    Ask {
        /// Natural-language question
        question: String,
        /// Print the full run envelope as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create the demo company database
    Seed {
        /// Where to write the database (defaults to the configured path)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Print the schema block the agent sees
    Schema,
}

impl Cli {
    /// Subcommand to run, `serve` when none is given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    /// Default tracing filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "sqlreact=info,tower_http=info",
            1 => "sqlreact=debug,tower_http=debug",
            _ => "trace",
        }
    }
}
