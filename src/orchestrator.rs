use crate::db::{ExecutionError, ExecutionResult, QueryExecutor};
use crate::llm::{GenerationResult, LlmError, LlmManager};
use crate::schema::SchemaContextBuilder;
use crate::validation::QueryValidator;
use serde::Serialize;
use std::error::Error;
use std::fmt;
use tracing::{debug, error, info};

#[derive(Debug)]
pub enum PromptQlError {
    Configuration(String),
    Generation(LlmError),
    /// SQL rejected by the validator; `sql` echoes what was rejected when it came from the LLM
    Validation { errors: Vec<String>, sql: Option<String> },
    Execution(ExecutionError),
}

impl fmt::Display for PromptQlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptQlError::Configuration(msg) => write!(f, "Not configured: {}", msg),
            PromptQlError::Generation(e) => write!(f, "{}", e),
            PromptQlError::Validation { errors, .. } => {
                write!(f, "SQL validation failed: {}", errors.join("; "))
            }
            PromptQlError::Execution(e) => write!(f, "{}", e),
        }
    }
}

impl Error for PromptQlError {}

impl From<LlmError> for PromptQlError {
    fn from(e: LlmError) -> Self {
        PromptQlError::Generation(e)
    }
}

impl From<ExecutionError> for PromptQlError {
    fn from(e: ExecutionError) -> Self {
        PromptQlError::Execution(e)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedQuery {
    pub sql: String,
    pub explanation: String,
    pub confidence: f64,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub prompt: String,
    pub generated: GeneratedQuery,
    pub execution: ExecutionResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaSnapshot {
    pub context: String,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub llm_provider: String,
}

/// Prompt → SQL → validation → rows. Holds only immutable state, so one
/// instance serves every request concurrently.
pub struct PromptQl {
    schema: SchemaContextBuilder,
    llm: Result<LlmManager, String>,
    executor: Result<QueryExecutor, String>,
    default_limit: usize,
    database_reachable: bool,
}

impl PromptQl {
    pub fn new(
        schema: SchemaContextBuilder,
        llm: Result<LlmManager, String>,
        executor: Result<QueryExecutor, String>,
        default_limit: usize,
    ) -> Self {
        Self {
            schema,
            llm,
            executor,
            default_limit,
            database_reachable: true,
        }
    }

    /// Runs the startup connection probe and remembers the outcome for `/health`.
    pub async fn probe_database(&mut self) -> bool {
        self.database_reachable = match &self.executor {
            Ok(executor) => executor.test_connection().await,
            Err(_) => false,
        };
        self.database_reachable
    }

    fn llm(&self) -> Result<&LlmManager, PromptQlError> {
        self.llm
            .as_ref()
            .map_err(|e| PromptQlError::Configuration(e.clone()))
    }

    fn executor(&self) -> Result<&QueryExecutor, PromptQlError> {
        self.executor
            .as_ref()
            .map_err(|e| PromptQlError::Configuration(e.clone()))
    }

    pub async fn generate(&self, prompt: &str) -> Result<GeneratedQuery, PromptQlError> {
        let llm = self.llm()?;

        let schema_context = self.schema.build_context();
        let examples = self.schema.examples();

        info!("Generating SQL with {} for prompt: {}", llm.provider_name(), prompt);
        let GenerationResult {
            sql,
            explanation,
            confidence,
            warnings: llm_warnings,
        } = llm
            .generate_sql(prompt, &schema_context, &examples)
            .await
            .inspect_err(|e| error!("SQL generation failed: {}", e))?;
        debug!("LLM returned SQL: {}", sql);

        let validation = QueryValidator::validate(&sql);
        let Some(sanitized) = validation.sanitized_sql else {
            info!("Generated SQL rejected: {:?}", validation.errors);
            return Err(PromptQlError::Validation {
                errors: validation.errors,
                sql: Some(sql),
            });
        };

        let mut warnings = validation.warnings;
        warnings.extend(llm_warnings);

        Ok(GeneratedQuery {
            sql: QueryValidator::ensure_limit(&sanitized, self.default_limit),
            explanation,
            confidence,
            warnings,
        })
    }

    pub async fn execute(&self, sql: &str) -> Result<ExecutionResult, PromptQlError> {
        let validation = QueryValidator::validate(sql);
        let Some(sanitized) = validation.sanitized_sql else {
            info!("Submitted SQL rejected: {:?}", validation.errors);
            return Err(PromptQlError::Validation {
                errors: validation.errors,
                sql: None,
            });
        };

        Ok(self
            .executor()?
            .execute_sql(&sanitized)
            .await
            .inspect_err(|e| error!("Query execution failed: {}", e))?)
    }

    pub async fn query(&self, prompt: &str) -> Result<QueryOutcome, PromptQlError> {
        let generated = self.generate(prompt).await?;

        let execution = self
            .executor()?
            .execute_sql(&generated.sql)
            .await
            .inspect_err(|e| error!("Query execution failed: {}", e))?;

        Ok(QueryOutcome {
            prompt: prompt.to_string(),
            generated,
            execution,
        })
    }

    pub fn schema(&self) -> SchemaSnapshot {
        SchemaSnapshot {
            context: self.schema.build_context(),
            examples: self.schema.examples(),
        }
    }

    pub fn health(&self) -> HealthReport {
        let healthy = self.llm.is_ok() && self.executor.is_ok() && self.database_reachable;
        HealthReport {
            status: if healthy { "ok" } else { "degraded" },
            service: "promptql",
            llm_provider: match &self.llm {
                Ok(llm) => llm.provider_name(),
                Err(_) => "unconfigured".to_string(),
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::SqlBackend;
    use crate::llm::SqlGenerator;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    pub(crate) struct MockGenerator {
        pub response: Result<GenerationResult, String>,
    }

    #[async_trait]
    impl SqlGenerator for MockGenerator {
        async fn generate_sql(
            &self,
            _prompt: &str,
            schema_context: &str,
            _examples: &[String],
        ) -> Result<GenerationResult, LlmError> {
            assert!(schema_context.contains("TABLE: claims"));
            self.response.clone().map_err(LlmError::ConnectionError)
        }

        fn provider_name(&self) -> String {
            "Mock (test)".to_string()
        }
    }

    /// Records every statement it is asked to run.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingBackend {
        pub result: Value,
        pub fail_with: Option<String>,
        pub calls: Arc<AtomicUsize>,
        pub last_sql: Arc<Mutex<Option<String>>>,
    }

    #[async_trait]
    impl SqlBackend for RecordingBackend {
        async fn run_sql(&self, sql: &str) -> Result<Value, ExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_sql.lock().unwrap() = Some(sql.to_string());
            match &self.fail_with {
                Some(msg) => Err(ExecutionError::BackendError(msg.clone())),
                None => Ok(self.result.clone()),
            }
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    pub(crate) fn generation(sql: &str, confidence: f64) -> GenerationResult {
        GenerationResult {
            sql: sql.to_string(),
            explanation: "test explanation".to_string(),
            confidence,
            warnings: vec![],
        }
    }

    pub(crate) fn promptql(
        response: Result<GenerationResult, String>,
        backend: RecordingBackend,
    ) -> PromptQl {
        PromptQl::new(
            SchemaContextBuilder::default(),
            Ok(LlmManager::with_generator(Box::new(MockGenerator { response }))),
            Ok(QueryExecutor::new(Box::new(backend))),
            100,
        )
    }

    fn claims_backend() -> RecordingBackend {
        RecordingBackend {
            result: json!([["id", "status"], ["c1", "DENIED"], ["c2", "DENIED"]]),
            ..RecordingBackend::default()
        }
    }

    #[tokio::test]
    async fn generate_adds_limit_and_merges_warnings() {
        let mut response = generation("SELECT * FROM claims", 0.7);
        response.warnings = vec!["Large result set possible".to_string()];
        let service = promptql(Ok(response), RecordingBackend::default());

        let generated = service.generate("all claims").await.unwrap();
        assert_eq!(generated.sql, "SELECT * FROM claims LIMIT 100");
        assert_eq!(generated.confidence, 0.7);
        assert_eq!(
            generated.warnings,
            vec![
                "No LIMIT clause - may return large result set".to_string(),
                "No WHERE clause - query will return all rows".to_string(),
                "Large result set possible".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn rejected_generation_echoes_sql_and_skips_database() {
        let backend = claims_backend();
        let calls = Arc::clone(&backend.calls);
        let service = promptql(Ok(generation("DELETE FROM claims", 0.9)), backend);

        match service.query("delete everything").await {
            Err(PromptQlError::Validation { errors, sql }) => {
                assert!(errors.contains(&"Forbidden keyword detected: DELETE".to_string()));
                assert_eq!(sql.as_deref(), Some("DELETE FROM claims"));
            }
            other => panic!("expected validation error, got {:?}", other.map(|_| ())),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn query_runs_generated_sql() {
        let backend = claims_backend();
        let last_sql = Arc::clone(&backend.last_sql);
        let service = promptql(
            Ok(generation("SELECT * FROM claims WHERE status='DENIED' LIMIT 50", 0.9)),
            backend,
        );

        let outcome = service.query("show me denied claims").await.unwrap();
        assert_eq!(outcome.prompt, "show me denied claims");
        assert_eq!(outcome.execution.row_count, outcome.execution.rows.len());
        assert_eq!(outcome.execution.row_count, 2);
        assert!(outcome.generated.warnings.is_empty());
        assert_eq!(
            last_sql.lock().unwrap().as_deref(),
            Some("SELECT * FROM claims WHERE status='DENIED' LIMIT 50")
        );
    }

    #[tokio::test]
    async fn execute_validates_before_running() {
        let backend = claims_backend();
        let calls = Arc::clone(&backend.calls);
        let service = promptql(Ok(generation("SELECT 1", 0.5)), backend);

        let err = service.execute("SELECT 1; DROP TABLE claims").await.unwrap_err();
        match err {
            PromptQlError::Validation { errors, sql } => {
                assert!(sql.is_none());
                assert!(errors.contains(&"Multiple SQL statements not allowed".to_string()));
                assert!(errors.contains(&"Potential SQL injection pattern detected".to_string()));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn execute_runs_trimmed_sql_without_adding_limit() {
        let backend = claims_backend();
        let last_sql = Arc::clone(&backend.last_sql);
        let service = promptql(Ok(generation("SELECT 1", 0.5)), backend);

        let result = service.execute("  SELECT id, status FROM claims WHERE status = 'DENIED'\n").await.unwrap();
        assert_eq!(result.row_count, 2);
        assert_eq!(
            last_sql.lock().unwrap().as_deref(),
            Some("SELECT id, status FROM claims WHERE status = 'DENIED'")
        );
    }

    #[tokio::test]
    async fn generation_failure_is_not_retried() {
        let service = promptql(Err("timeout".to_string()), claims_backend());
        assert!(matches!(
            service.query("anything").await,
            Err(PromptQlError::Generation(LlmError::ConnectionError(_)))
        ));
    }

    #[tokio::test]
    async fn execution_failure_surfaces() {
        let backend = RecordingBackend {
            fail_with: Some("permission denied for table claims".to_string()),
            ..RecordingBackend::default()
        };
        let service = promptql(Ok(generation("SELECT * FROM claims WHERE id = 'c1'", 0.9)), backend);
        assert!(matches!(
            service.query("claim c1").await,
            Err(PromptQlError::Execution(ExecutionError::BackendError(_)))
        ));
    }

    #[tokio::test]
    async fn unconfigured_dependencies_degrade_health() {
        let mut service = PromptQl::new(
            SchemaContextBuilder::default(),
            Err("API key is required".to_string()),
            Ok(QueryExecutor::new(Box::new(claims_backend()))),
            100,
        );
        assert!(service.probe_database().await);
        assert!(matches!(
            service.generate("x").await,
            Err(PromptQlError::Configuration(_))
        ));

        let health = service.health();
        assert_eq!(health.status, "degraded");
        assert_eq!(health.service, "promptql");
        assert_eq!(health.llm_provider, "unconfigured");
    }

    fn without_database(response: Result<GenerationResult, String>) -> PromptQl {
        PromptQl::new(
            SchemaContextBuilder::default(),
            Ok(LlmManager::with_generator(Box::new(MockGenerator { response }))),
            Err("Unsupported database backend: oracle".to_string()),
            100,
        )
    }

    #[tokio::test]
    async fn rejected_sql_is_a_validation_error_even_without_database() {
        let service = without_database(Ok(generation("DELETE FROM claims", 0.9)));

        assert!(matches!(
            service.execute("DROP TABLE claims").await,
            Err(PromptQlError::Validation { sql: None, .. })
        ));
        assert!(matches!(
            service.query("delete everything").await,
            Err(PromptQlError::Validation { sql: Some(_), .. })
        ));
    }

    #[tokio::test]
    async fn valid_sql_without_database_is_configuration_error() {
        let service = without_database(Ok(generation("SELECT * FROM claims WHERE id = 'c1'", 0.9)));

        assert!(matches!(
            service.execute("SELECT 1").await,
            Err(PromptQlError::Configuration(_))
        ));
        assert!(matches!(
            service.query("claim c1").await,
            Err(PromptQlError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_database_degrades_health() {
        let backend = RecordingBackend {
            fail_with: Some("connection refused".to_string()),
            ..RecordingBackend::default()
        };
        let mut service = promptql(Ok(generation("SELECT 1", 0.5)), backend);
        assert_eq!(service.health().status, "ok");
        assert!(!service.probe_database().await);
        assert_eq!(service.health().status, "degraded");
        assert_eq!(service.health().llm_provider, "Mock (test)");
    }
}
