use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::db::executor::{ExecutionResult, Row};
use crate::orchestrator::{GeneratedQuery, HealthReport, SchemaSnapshot};
use crate::web::error::ApiError;
use crate::web::state::AppState;

// Request types

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub sql: Option<String>,
}

// Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub data: Vec<Row>,
    pub row_count: usize,
    pub execution_time: u64,
}

impl From<ExecutionResult> for ExecuteResponse {
    fn from(result: ExecutionResult) -> Self {
        Self {
            data: result.rows,
            row_count: result.row_count,
            execution_time: result.execution_time_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub prompt: String,
    #[serde(flatten)]
    pub generated: GeneratedQuery,
    #[serde(flatten)]
    pub execution: ExecuteResponse,
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::invalid_json(rejection.body_text()))
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::missing_field(field)),
    }
}

// API Implementations

pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<GeneratedQuery>, ApiError> {
    let prompt = required(parse_body(payload)?.prompt, "prompt")?;

    let generated = state
        .promptql
        .generate(&prompt)
        .await
        .map_err(|e| ApiError::from_promptql(e, "SQL generation failed"))?;

    Ok(Json(generated))
}

pub async fn execute(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let sql = required(parse_body(payload)?.sql, "sql")?;

    let result = state
        .promptql
        .execute(&sql)
        .await
        .map_err(|e| ApiError::from_promptql(e, "Query execution failed"))?;

    Ok(Json(result.into()))
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let prompt = required(parse_body(payload)?.prompt, "prompt")?;

    let outcome = state
        .promptql
        .query(&prompt)
        .await
        .map_err(|e| ApiError::from_promptql(e, "Query failed"))?;

    info!(
        "Answered prompt with {} rows in {}ms",
        outcome.execution.row_count, outcome.execution.execution_time_ms
    );

    Ok(Json(QueryResponse {
        prompt: outcome.prompt,
        generated: outcome.generated,
        execution: outcome.execution.into(),
    }))
}

pub async fn schema(State(state): State<Arc<AppState>>) -> Json<SchemaSnapshot> {
    Json(state.promptql.schema())
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(state.promptql.health())
}
