use crate::config::DatabaseConfig;
use crate::db::db_pool::ReadOnlyDuckDbManager;
use crate::db::{ExecutionError, SqlBackend};
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime};
use duckdb::types::{TimeUnit, Value as DuckValue};
use r2d2::Pool;
use serde_json::{Number, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Local DuckDB file served in the same header-plus-rows shape as Hasura.
pub struct DuckDbBackend {
    pool: Pool<ReadOnlyDuckDbManager>,
}

impl DuckDbBackend {
    pub fn new(config: &DatabaseConfig) -> Result<Self, ExecutionError> {
        info!("Initializing DuckDB connection pool for {}", config.connection_string);

        let manager = ReadOnlyDuckDbManager::new(&config.connection_string);
        // Unchecked so a missing file degrades the service instead of blocking startup
        let pool = Pool::builder()
            .max_size(config.pool_size.max(1) as u32)
            .connection_timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build_unchecked(manager);

        Ok(Self { pool })
    }
}

fn backend_error(e: duckdb::Error) -> ExecutionError {
    ExecutionError::BackendError(e.to_string())
}

/// Scalars become JSON scalars; dates, times and decimals become the text
/// DuckDB would print for them.
fn to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(n) => n.into(),
        DuckValue::SmallInt(n) => n.into(),
        DuckValue::Int(n) => n.into(),
        DuckValue::BigInt(n) => n.into(),
        // SUM/COUNT over integers come back as HUGEINT
        DuckValue::HugeInt(n) => i64::try_from(n).map_or_else(|_| Value::String(n.to_string()), Value::from),
        DuckValue::UTinyInt(n) => n.into(),
        DuckValue::USmallInt(n) => n.into(),
        DuckValue::UInt(n) => n.into(),
        DuckValue::UBigInt(n) => n.into(),
        DuckValue::Float(f) => Number::from_f64(f as f64).map_or(Value::Null, Value::Number),
        DuckValue::Double(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        DuckValue::Decimal(d) => Value::String(d.to_string()),
        DuckValue::Text(s) | DuckValue::Enum(s) => Value::String(s),
        DuckValue::Date32(days) => DateTime::from_timestamp(i64::from(days) * 86_400, 0)
            .map_or(Value::Null, |dt| Value::String(dt.date_naive().to_string())),
        DuckValue::Timestamp(unit, value) => DateTime::from_timestamp_micros(unit.to_micros(value))
            .map_or(Value::Null, |dt| {
                Value::String(dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }),
        DuckValue::Time64(unit, value) => {
            let micros = unit.to_micros(value);
            NaiveTime::from_num_seconds_from_midnight_opt(
                (micros / 1_000_000) as u32,
                ((micros % 1_000_000) * 1_000) as u32,
            )
            .map_or(Value::Null, |t| Value::String(t.to_string()))
        }
        DuckValue::List(items) | DuckValue::Array(items) => {
            Value::Array(items.into_iter().map(to_json).collect())
        }
        other => Value::String(format!("{:?}", other)),
    }
}

fn run_blocking(pool: &Pool<ReadOnlyDuckDbManager>, sql: &str) -> Result<Value, ExecutionError> {
    let conn = pool
        .get()
        .map_err(|e| ExecutionError::ConnectionError(e.to_string()))?;

    let mut stmt = conn.prepare(sql).map_err(backend_error)?;
    let mut rows = stmt.query([]).map_err(backend_error)?;

    let columns: Vec<String> = rows
        .as_ref()
        .map(|stmt| stmt.column_names().into_iter().map(|n| n.to_string()).collect())
        .unwrap_or_default();

    let mut table = vec![Value::Array(
        columns.iter().cloned().map(Value::String).collect(),
    )];

    while let Some(row) = rows.next().map_err(backend_error)? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let value: DuckValue = row.get(i).map_err(backend_error)?;
            values.push(to_json(value));
        }
        table.push(Value::Array(values));
    }

    debug!("DuckDB returned {} rows", table.len() - 1);
    Ok(Value::Array(table))
}

#[async_trait]
impl SqlBackend for DuckDbBackend {
    async fn run_sql(&self, sql: &str) -> Result<Value, ExecutionError> {
        let pool = self.pool.clone();
        let sql = sql.to_string();

        // DuckDB calls block, keep them off the async workers
        tokio::task::spawn_blocking(move || run_blocking(&pool, &sql))
            .await
            .map_err(|e| ExecutionError::BackendError(format!("Database task execution failed: {}", e)))?
    }

    fn name(&self) -> &str {
        "DuckDB"
    }
}
