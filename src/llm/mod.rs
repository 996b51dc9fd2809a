pub mod models;
pub mod prompt;
pub mod providers;

use crate::config::LlmConfig;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;

pub use models::GenerationResult;

#[derive(Debug)]
pub enum LlmError {
    ConnectionError(String),
    ResponseError(String),
    ConfigError(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ConnectionError(msg) => write!(f, "LLM connection error: {}", msg),
            LlmError::ResponseError(msg) => write!(f, "LLM response error: {}", msg),
            LlmError::ConfigError(msg) => write!(f, "LLM configuration error: {}", msg),
        }
    }
}

impl Error for LlmError {}

#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate_sql(
        &self,
        prompt: &str,
        schema_context: &str,
        examples: &[String],
    ) -> Result<GenerationResult, LlmError>;

    fn provider_name(&self) -> String;
}

pub struct LlmManager {
    generator: Box<dyn SqlGenerator + Send + Sync>,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let generator: Box<dyn SqlGenerator + Send + Sync> = match config.backend.as_str() {
            "openai" => Box::new(providers::openai::OpenAiProvider::new(config)?),
            "anthropic" => Box::new(providers::anthropic::AnthropicProvider::new(config)?),
            "ollama" => Box::new(providers::ollama::OllamaProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self { generator })
    }

    #[cfg(test)]
    pub fn with_generator(generator: Box<dyn SqlGenerator + Send + Sync>) -> Self {
        Self { generator }
    }

    pub async fn generate_sql(
        &self,
        prompt: &str,
        schema_context: &str,
        examples: &[String],
    ) -> Result<GenerationResult, LlmError> {
        self.generator.generate_sql(prompt, schema_context, examples).await
    }

    pub fn provider_name(&self) -> String {
        self.generator.provider_name()
    }
}
