use crate::llm::locale::Language;
use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub connection_string: String,
    pub pool_size: usize,
    pub read_only: bool,
    /// Statements other than reads are refused unless this is set.
    pub allow_writes: bool,
    pub max_rows: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // "anthropic", "remote", or "ollama"
    pub model: String,   // Model name
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is not configured.
    pub api_key_env: String,
    pub api_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
    /// SQL dialect named in the prompt.
    pub dialect: String,
    pub language: Language,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// DuckDB database file to query
    #[arg(short, long, value_name = "PATH")]
    pub database: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Generate SQL for a single question, print it and exit
    #[arg(long, value_name = "QUESTION")]
    pub ask: Option<String>,
}

const ENV_PREFIX: &str = "TEXT2SQL";

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        // Start with default configuration
        let mut config_builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/text2sql/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        // TEXT2SQL__LLM__MODEL=... overrides llm.model
        config_builder = config_builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }
        if let Some(database) = &args.database {
            config.database.connection_string = database.clone();
        }

        config.llm.resolve_api_key(|name| std::env::var(name).ok());

        Ok(config)
    }
}

impl LlmConfig {
    /// Fills `api_key` from the environment when it is not configured.
    pub fn resolve_api_key(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let configured = self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty());
        if !configured {
            self.api_key = lookup(&self.api_key_env).filter(|key| !key.trim().is_empty());
        }
    }
}

// Default implementation
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            llm: LlmConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: "text2sql.duckdb".to_string(),
            pool_size: 5,
            read_only: false,
            allow_writes: false,
            max_rows: 10_000,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: "anthropic".to_string(),
            model: "claude-3-7-sonnet-20250219".to_string(),
            api_key: None,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            api_url: None,
            max_tokens: 1500,
            temperature: None,
            timeout_secs: 60,
            dialect: "DuckDB".to_string(),
            language: Language::Lao,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.web.port, 3000);
        assert_eq!(config.llm.backend, "anthropic");
        assert_eq!(config.llm.max_tokens, 1500);
        assert_eq!(config.llm.language, Language::Lao);
        assert!(!config.database.allow_writes);
    }

    #[test]
    fn test_api_key_resolved_from_environment_lookup() {
        let mut llm = LlmConfig::default();
        llm.resolve_api_key(|name| (name == "ANTHROPIC_API_KEY").then(|| "sk-env".to_string()));
        assert_eq!(llm.api_key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn test_configured_api_key_wins() {
        let mut llm = LlmConfig {
            api_key: Some("sk-file".to_string()),
            ..LlmConfig::default()
        };
        llm.resolve_api_key(|_| Some("sk-env".to_string()));
        assert_eq!(llm.api_key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn test_blank_environment_key_ignored() {
        let mut llm = LlmConfig::default();
        llm.resolve_api_key(|_| Some("   ".to_string()));
        assert_eq!(llm.api_key, None);
    }

    #[test]
    fn test_file_overrides_defaults_and_cli_overrides_file() {
        let path = std::env::temp_dir().join(format!("text2sql-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[web]\nport = 8088\n\n[llm]\nbackend = \"ollama\"\nmodel = \"sqlcoder\"\nlanguage = \"english\"\n"
        )
        .unwrap();

        let args = CliArgs {
            config: Some(path.clone()),
            host: Some("0.0.0.0".to_string()),
            ..CliArgs::default()
        };
        let config = AppConfig::new(&args).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.web.port, 8088);
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.llm.backend, "ollama");
        assert_eq!(config.llm.model, "sqlcoder");
        assert_eq!(config.llm.language, Language::English);
        assert_eq!(config.llm.max_tokens, 1500);
        assert_eq!(config.database.max_rows, 10_000);
    }
}
