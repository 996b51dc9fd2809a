use crate::config::LlmConfig;
use crate::llm::models::GenerationResult;
use crate::llm::prompt::{build_system_prompt, build_user_prompt};
use crate::llm::providers::{build_client, truncate_body};
use crate::llm::{LlmError, SqlGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const DEFAULT_API_URL: &str = "http://localhost:11434/api/generate";
const DEFAULT_MODEL: &str = "sqlcoder";

pub struct OllamaProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize, Debug)]
struct OllamaRequest {
    model: String,
    system: String,
    prompt: String,
    format: &'static str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize, Debug)]
struct OllamaOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    done: Option<bool>,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            client: build_client(config)?,
            api_url,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn build_request(&self, prompt: &str, schema_context: &str, examples: &[String]) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            system: build_system_prompt(schema_context, examples),
            prompt: build_user_prompt(prompt),
            format: "json",
            stream: false, // Explicitly disable streaming
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        }
    }
}

#[async_trait]
impl SqlGenerator for OllamaProvider {
    async fn generate_sql(
        &self,
        prompt: &str,
        schema_context: &str,
        examples: &[String],
    ) -> Result<GenerationResult, LlmError> {
        let request = self.build_request(prompt, schema_context, examples);

        info!("Sending request to Ollama with model: {}", self.model);
        debug!("API URL: {}", self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            // Try to get the error message from the response body
            let error_body = match response.text().await {
                Ok(body) => format!(" - Response body: {}", truncate_body(&body)),
                Err(_) => String::new(),
            };

            error!("Ollama API responded with status code: {}{}", status, error_body);
            return Err(LlmError::ResponseError(format!(
                "Ollama API responded with status code: {}{}",
                status, error_body
            )));
        }

        // Get the raw text response first for diagnostics
        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseError(format!("Failed to read response body: {}", e)))?;

        debug!("Raw response from Ollama: {}", response_text);

        let ollama_response = match serde_json::from_str::<OllamaResponse>(&response_text) {
            Ok(resp) => resp,
            Err(e) => {
                error!("Failed to parse Ollama response: {} - Response was: {}", e, response_text);
                return Err(LlmError::ResponseError(format!(
                    "Failed to parse Ollama response: {} - Response was: {}",
                    e, response_text
                )));
            }
        };

        if ollama_response.done == Some(false) {
            return Err(LlmError::ResponseError(
                "Ollama returned an incomplete response".to_string(),
            ));
        }

        GenerationResult::from_model_text(&ollama_response.response)
    }

    fn provider_name(&self) -> String {
        format!("Ollama ({})", self.model)
    }
}
