use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

pub mod validator;

use crate::agents::config::{AgentConfig, LlmProviderConfig};
use crate::cli::Cli;

/// Prefix of environment overrides, e.g. `SQLREACT__AGENT__MAX_ITERATIONS=5`
pub const ENV_PREFIX: &str = "SQLREACT";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub llm: LlmProviderConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseSettings {
    /// SQLite file opened by `/init` when no path is given, and by the CLI
    pub path: PathBuf,
}

impl Settings {
    /// Load settings for the CLI (CLI > env vars > config file > defaults)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let mut settings = Self::load(&cli.config)?;

        // Apply CLI overrides
        settings.apply_cli_overrides(cli);

        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a specific file (which may be absent)
    pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let settings = Self::load(path)?;
        settings.validate()?;
        Ok(settings)
    }

    fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("database.path", "database/company.db")?
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(s.try_deserialize()?)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        // Server overrides
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }

        if let Some(database) = &cli.database {
            self.database.path = database.clone();
        }

        // LLM overrides
        if let Some(provider) = cli.provider {
            self.llm.provider = provider;
        }
        if let Some(model) = &cli.model {
            self.agent.model_name = model.clone();
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn toml_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::from_file(Path::new("/nonexistent/sqlreact.toml")).unwrap();
        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.database.path, PathBuf::from("database/company.db"));
        assert_eq!(settings.agent, AgentConfig::default());
        assert!(settings.rate_limit.is_none());
    }

    #[test]
    fn test_file_values() {
        let file = toml_file(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [database]
            path = "data/shop.db"

            [llm]
            provider = "openai"
            api_key_env = "MY_KEY"

            [agent]
            max_iterations = 5
            min_delay_between_calls = 2.5
            retry_delay = 1
            "#,
        );

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.database.path, PathBuf::from("data/shop.db"));
        assert_eq!(settings.llm.api_key_env(), "MY_KEY");
        assert_eq!(settings.agent.max_iterations, 5);
        assert_eq!(settings.agent.min_delay_between_calls, Duration::from_millis(2500));
        assert_eq!(settings.agent.retry_delay, Duration::from_secs(1));
        assert_eq!(settings.agent.max_retries, 3);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = toml_file("[server]\nport = 8080\n");
        let path = file.path().to_str().unwrap().to_string();
        let cli = Cli::parse_from([
            "sqlreact",
            "--config",
            &path,
            "--port",
            "9090",
            "--database",
            "other.db",
            "--model",
            "llama-3.3-70b-versatile",
        ]);

        let settings = Settings::new_with_cli(&cli).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.database.path, PathBuf::from("other.db"));
        assert_eq!(settings.agent.model_name, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_invalid_values_are_all_reported() {
        let file = toml_file(
            r#"
            [server]
            port = 0

            [agent]
            max_iterations = 0
            stop_sequences = ["END"]
            "#,
        );

        let err = Settings::from_file(file.path()).unwrap_err().to_string();
        assert!(err.contains("server.port"));
        assert!(err.contains("agent.max_iterations"));
        assert!(err.contains("agent.stop_sequences"));
    }
}
