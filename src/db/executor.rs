use crate::db::{ExecutionError, SqlBackend};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Instant;
use tracing::{debug, error, info};

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

/// Runs validated SQL against the configured backend and turns the
/// column-oriented result into row objects.
pub struct QueryExecutor {
    backend: Box<dyn SqlBackend>,
}

impl QueryExecutor {
    pub fn new(backend: Box<dyn SqlBackend>) -> Self {
        Self { backend }
    }

    pub async fn execute_sql(&self, sql: &str) -> Result<ExecutionResult, ExecutionError> {
        let start_time = Instant::now();
        debug!("Executing SQL on {}: {}", self.backend.name(), sql);

        let result = self.backend.run_sql(sql).await;
        let execution_time_ms = start_time.elapsed().as_millis() as u64;

        let rows = rows_from_result(result?)?;

        info!(
            "Query executed successfully. Row count: {}, Execution time: {}ms",
            rows.len(),
            execution_time_ms
        );

        Ok(ExecutionResult {
            row_count: rows.len(),
            rows,
            execution_time_ms,
        })
    }

    /// Startup probe: never fails, only reports.
    pub async fn test_connection(&self) -> bool {
        match self.execute_sql("SELECT 1").await {
            Ok(_) => true,
            Err(e) => {
                error!("{} connection test failed: {}", self.backend.name(), e);
                false
            }
        }
    }
}

/// Zips every data row with the header row.
///
/// Anything other than a non-empty array means "no rows". A header that isn't
/// a list of column names, or a data row that isn't a list, is an error.
pub fn rows_from_result(result: Value) -> Result<Vec<Row>, ExecutionError> {
    let Value::Array(table) = result else {
        return Ok(Vec::new());
    };

    let mut table = table.into_iter();
    let Some(header) = table.next() else {
        return Ok(Vec::new());
    };

    let columns = match header {
        Value::Array(names) => names
            .into_iter()
            .map(|name| match name {
                Value::String(s) => Ok(s),
                other => Err(ExecutionError::UnexpectedShape(format!(
                    "column name is not a string: {}",
                    other
                ))),
            })
            .collect::<Result<Vec<String>, _>>()?,
        other => {
            return Err(ExecutionError::UnexpectedShape(format!(
                "header row is not an array: {}",
                other
            )))
        }
    };

    table
        .enumerate()
        .map(|(index, row)| match row {
            Value::Array(values) => {
                let mut values = values.into_iter();
                Ok(columns
                    .iter()
                    .map(|column| (column.clone(), values.next().unwrap_or(Value::Null)))
                    .collect::<Row>())
            }
            other => Err(ExecutionError::UnexpectedShape(format!(
                "row {} is not an array: {}",
                index + 1,
                other
            ))),
        })
        .collect()
}
