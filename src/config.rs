use clap::Parser;
use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub backend: String,       // "openai", "anthropic", or "ollama"
    pub model: Option<String>, // None picks the backend's default model
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: String, // "hasura" or "duckdb"
    pub endpoint: String,
    pub admin_secret: Option<String>,
    pub source: String,
    pub connection_string: String,
    pub pool_size: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ValidationConfig {
    pub default_limit: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SchemaConfig {
    /// YAML, TOML or JSON file describing tables, glossary and prompt patterns
    pub catalog_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub web: WebConfig,
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    pub validation: ValidationConfig,
    pub schema: SchemaConfig,
}

#[derive(Parser, Debug)]
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

    /// LLM backend to use (openai, anthropic, ollama)
    #[arg(long)]
    pub llm_backend: Option<String>,

    /// Schema catalog file used to ground SQL generation
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<String>,

    /// Log output format (pretty or json)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        let env: Map<String, String> = std::env::vars().collect();
        Self::from_sources(args, &env)
    }

    /// Precedence, lowest first: serde defaults, the plain variables the
    /// ClaimSight `.env` ships (`PROMPTQL_PORT`, `HASURA_GRAPHQL_ENDPOINT`, ...),
    /// the config file, `PROMPTQL__*` variables, command line flags.
    fn from_sources(args: &CliArgs, env: &Map<String, String>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| env.get(key).filter(|v| !v.trim().is_empty()).cloned();

        let mut config_builder = Config::builder();

        if let Some(port) = lookup("PROMPTQL_PORT").and_then(|p| p.parse::<u16>().ok()) {
            config_builder = config_builder.set_default("web.port", i64::from(port))?;
        }
        for (var, key) in [
            ("PROMPTQL_LLM_PROVIDER", "llm.backend"),
            ("HASURA_GRAPHQL_ENDPOINT", "database.endpoint"),
            ("HASURA_GRAPHQL_ADMIN_SECRET", "database.admin_secret"),
        ] {
            if let Some(value) = lookup(var) {
                config_builder = config_builder.set_default(key, value)?;
            }
        }

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = vec![
                "promptql.toml",
                "config/promptql.toml",
                "/etc/promptql/promptql.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        // PROMPTQL__LLM__API_KEY, PROMPTQL__DATABASE__ENDPOINT, ...
        config_builder = config_builder.add_source(
            Environment::with_prefix("PROMPTQL")
                .prefix_separator("__")
                .separator("__")
                .source(Some(env.clone())),
        );

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }
        if let Some(backend) = &args.llm_backend {
            config.llm.backend = backend.clone();
        }
        if let Some(catalog) = &args.catalog {
            config.schema.catalog_path = Some(catalog.clone());
        }

        // Provider keys follow the backend that was finally chosen
        if config.llm.api_key.is_none() {
            config.llm.api_key = match config.llm.backend.as_str() {
                "openai" => lookup("OPENAI_API_KEY"),
                "anthropic" => lookup("ANTHROPIC_API_KEY"),
                _ => None,
            };
        }

        Ok(config)
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3003,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: "openai".to_string(),
            model: None,
            api_key: None,
            api_url: None,
            temperature: 0.1,
            max_tokens: 2000,
            timeout_secs: 60,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: "hasura".to_string(),
            endpoint: "http://localhost:8080".to_string(),
            admin_secret: None,
            source: "default".to_string(),
            connection_string: "claimsight.duckdb".to_string(),
            pool_size: 5,
            timeout_secs: 30,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { default_limit: 100 }
    }
}
