use crate::config::DatabaseConfig;
use crate::db::{ExecutionError, SqlBackend};
use crate::validation::QueryValidator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Hasura's schema/metadata API (`/v2/query`) running `run_sql`.
pub struct HasuraBackend {
    client: reqwest::Client,
    query_url: String,
    admin_secret: Option<String>,
    source: String,
}

#[derive(Serialize)]
struct RunSqlRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    args: RunSqlArgs<'a>,
}

#[derive(Serialize)]
struct RunSqlArgs<'a> {
    source: &'a str,
    sql: &'a str,
    read_only: bool,
}

#[derive(Deserialize)]
struct RunSqlResponse {
    result_type: Option<String>,
    #[serde(default)]
    result: Value,
}

#[derive(Deserialize)]
struct HasuraErrorBody {
    error: Option<String>,
    code: Option<String>,
}

impl HasuraBackend {
    pub fn new(config: &DatabaseConfig) -> Result<Self, ExecutionError> {
        if config.endpoint.trim().is_empty() {
            return Err(ExecutionError::ConfigError(
                "Hasura endpoint is required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExecutionError::ConfigError(e.to_string()))?;

        let source = QueryValidator::sanitize_identifier(&config.source);
        if source.is_empty() {
            return Err(ExecutionError::ConfigError(format!(
                "Invalid Hasura source name: {:?}",
                config.source
            )));
        }

        Ok(Self {
            client,
            query_url: query_url(&config.endpoint),
            admin_secret: config.admin_secret.clone().filter(|s| !s.is_empty()),
            source,
        })
    }

    fn build_request<'a>(&'a self, sql: &'a str) -> RunSqlRequest<'a> {
        RunSqlRequest {
            kind: "run_sql",
            args: RunSqlArgs {
                source: &self.source,
                sql,
                read_only: true,
            },
        }
    }
}

// Accepts the bare Hasura URL as well as the GraphQL endpoint people tend to configure
fn query_url(endpoint: &str) -> String {
    let base = endpoint.trim().trim_end_matches('/');
    let base = base.strip_suffix("/v1/graphql").unwrap_or(base);
    format!("{}/v2/query", base)
}

#[async_trait]
impl SqlBackend for HasuraBackend {
    async fn run_sql(&self, sql: &str) -> Result<Value, ExecutionError> {
        let mut request = self.client.post(&self.query_url).json(&self.build_request(sql));
        if let Some(secret) = &self.admin_secret {
            request = request.header("x-hasura-admin-secret", secret);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExecutionError::ConnectionError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExecutionError::ConnectionError(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<HasuraErrorBody>(&body) {
                Ok(HasuraErrorBody { error: Some(error), code }) => match code {
                    Some(code) => format!("{} ({})", error, code),
                    None => error,
                },
                _ => format!("Hasura responded with status code: {} - {}", status, body),
            };
            error!("Hasura run_sql failed: {}", message);
            return Err(ExecutionError::BackendError(message));
        }

        debug!("Raw response from Hasura: {}", body);

        let parsed: RunSqlResponse = serde_json::from_str(&body).map_err(|e| {
            ExecutionError::UnexpectedShape(format!("Invalid response from Hasura: {}", e))
        })?;

        if parsed.result_type.is_none() {
            return Err(ExecutionError::UnexpectedShape(
                "Invalid response from Hasura: missing result_type".to_string(),
            ));
        }

        Ok(parsed.result)
    }

    fn name(&self) -> &str {
        "Hasura"
    }
}
