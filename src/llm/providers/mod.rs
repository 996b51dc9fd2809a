pub mod anthropic;
pub mod ollama;
pub mod openai;

use crate::config::LlmConfig;
use crate::llm::LlmError;
use std::time::Duration;

pub(crate) fn build_client(config: &LlmConfig) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| LlmError::ConnectionError(e.to_string()))
}

pub(crate) fn require_api_key(config: &LlmConfig, provider: &str) -> Result<String, LlmError> {
    config
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            LlmError::ConfigError(format!("API key is required for {} provider", provider))
        })
}

// Error body, cut down so a huge HTML error page doesn't flood the logs
pub(crate) fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(500) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
