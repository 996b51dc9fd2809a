use crate::config::LlmConfig;
use crate::llm::models::GenerationResult;
use crate::llm::prompt::{build_system_prompt, build_user_prompt};
use crate::llm::providers::{build_client, require_api_key, truncate_body};
use crate::llm::{LlmError, SqlGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = require_api_key(config, "Anthropic")?;

        Ok(Self {
            client: build_client(config)?,
            api_url: config
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn build_request(&self, prompt: &str, schema_context: &str, examples: &[String]) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: build_system_prompt(schema_context, examples),
            messages: vec![Message {
                role: "user".to_string(),
                content: build_user_prompt(prompt),
            }],
        }
    }

    // Claude may wrap the JSON in markdown, so only the first text block is kept
    fn first_text(response: MessagesResponse) -> Result<String, LlmError> {
        let block = response
            .content
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ResponseError("Empty response from Claude".to_string()))?;

        if block.kind != "text" {
            return Err(LlmError::ResponseError(format!(
                "Unexpected response type from Claude: {}",
                block.kind
            )));
        }

        block
            .text
            .ok_or_else(|| LlmError::ResponseError("Text block without text from Claude".to_string()))
    }
}

#[async_trait]
impl SqlGenerator for AnthropicProvider {
    async fn generate_sql(
        &self,
        prompt: &str,
        schema_context: &str,
        examples: &[String],
    ) -> Result<GenerationResult, LlmError> {
        let request = self.build_request(prompt, schema_context, examples);

        info!("Sending request to Anthropic with model: {}", self.model);

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Anthropic API responded with status code: {}", status);
            return Err(LlmError::ResponseError(format!(
                "API responded with status code: {} - {}",
                status,
                truncate_body(&body)
            )));
        }

        let messages: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseError(e.to_string()))?;

        let text = Self::first_text(messages)?;
        debug!("Raw text from Anthropic: {}", text);
        GenerationResult::from_model_text(&text)
    }

    fn provider_name(&self) -> String {
        format!("Anthropic ({})", self.model)
    }
}
