pub mod db_pool;
pub mod duckdb_backend;
pub mod executor;
pub mod hasura;

use crate::config::DatabaseConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use std::fmt;

pub use executor::{ExecutionResult, QueryExecutor};

#[derive(Debug)]
pub enum ExecutionError {
    ConnectionError(String),
    BackendError(String),
    UnexpectedShape(String),
    ConfigError(String),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::ConnectionError(msg) => write!(f, "Database connection error: {}", msg),
            ExecutionError::BackendError(msg) => write!(f, "Database error: {}", msg),
            ExecutionError::UnexpectedShape(msg) => write!(f, "Unexpected result shape: {}", msg),
            ExecutionError::ConfigError(msg) => write!(f, "Database configuration error: {}", msg),
        }
    }
}

impl Error for ExecutionError {}

/// A `run_sql`-style execution target.
///
/// Implementations return the raw tabular result: an array whose first row
/// holds the column names and whose remaining rows hold positionally aligned
/// values. Queries with no tabular output may return `null` or an empty array.
#[async_trait]
pub trait SqlBackend: Send + Sync {
    async fn run_sql(&self, sql: &str) -> Result<Value, ExecutionError>;

    fn name(&self) -> &str;
}

pub fn create_backend(config: &DatabaseConfig) -> Result<Box<dyn SqlBackend>, ExecutionError> {
    match config.backend.as_str() {
        "hasura" => Ok(Box::new(hasura::HasuraBackend::new(config)?)),
        "duckdb" => Ok(Box::new(duckdb_backend::DuckDbBackend::new(config)?)),
        other => Err(ExecutionError::ConfigError(format!(
            "Unsupported database backend: {}",
            other
        ))),
    }
}
