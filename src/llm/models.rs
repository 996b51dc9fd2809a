use crate::llm::LlmError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

// Normalized output of every backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub sql: String,
    pub explanation: String,
    pub confidence: f64,
    pub warnings: Vec<String>,
}

// What the model is asked to emit; every field is best-effort
#[derive(Debug, Deserialize)]
struct ModelOutput {
    #[serde(default)]
    sql: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default)]
    warnings: Option<Vec<Value>>,
}

impl GenerationResult {
    /// Parses the JSON object a model returned, tolerating surrounding prose or
    /// markdown fences.
    pub fn from_model_text(content: &str) -> Result<Self, LlmError> {
        let json = extract_json_object(content).ok_or_else(|| {
            LlmError::ResponseError(format!("No JSON object found in model response: {}", content))
        })?;

        let output: ModelOutput = serde_json::from_str(json).map_err(|e| {
            LlmError::ResponseError(format!("Failed to parse model response: {} - Response was: {}", e, json))
        })?;

        let sql = output
            .sql
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LlmError::ResponseError("Model response is missing the sql field".to_string()))?;

        let confidence = output
            .confidence
            .as_ref()
            .and_then(Value::as_f64)
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_CONFIDENCE);

        let warnings = output
            .warnings
            .unwrap_or_default()
            .into_iter()
            .filter_map(|w| match w {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect();

        Ok(Self {
            sql,
            explanation: output.explanation.unwrap_or_default(),
            confidence,
            warnings,
        })
    }
}

// Outermost `{ ... }` span
fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_object() {
        let result = GenerationResult::from_model_text(
            r#"{"sql": "SELECT * FROM claims WHERE status='DENIED' LIMIT 50", "explanation": "Denied claims", "confidence": 0.9, "warnings": ["Large result set possible"]}"#,
        )
        .unwrap();

        assert_eq!(result.sql, "SELECT * FROM claims WHERE status='DENIED' LIMIT 50");
        assert_eq!(result.explanation, "Denied claims");
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.warnings, vec!["Large result set possible".to_string()]);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let result = GenerationResult::from_model_text(r#"{"sql": "SELECT 1"}"#).unwrap();
        assert_eq!(result.explanation, "");
        assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn extracts_object_from_markdown() {
        let text = "Here you go:\n```json\n{\"sql\": \"SELECT id FROM members LIMIT 5\", \"confidence\": 0.7}\n```\nLet me know!";
        let result = GenerationResult::from_model_text(text).unwrap();
        assert_eq!(result.sql, "SELECT id FROM members LIMIT 5");
        assert_eq!(result.confidence, 0.7);
    }

    #[test]
    fn confidence_is_clamped_or_defaulted() {
        let high = GenerationResult::from_model_text(r#"{"sql": "SELECT 1", "confidence": 7}"#).unwrap();
        assert_eq!(high.confidence, 1.0);

        let text = GenerationResult::from_model_text(r#"{"sql": "SELECT 1", "confidence": "high"}"#).unwrap();
        assert_eq!(text.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn non_string_warnings_are_dropped() {
        let result =
            GenerationResult::from_model_text(r#"{"sql": "SELECT 1", "warnings": ["ok", 3, null]}"#).unwrap();
        assert_eq!(result.warnings, vec!["ok".to_string()]);
    }

    #[test]
    fn rejects_output_without_json() {
        let err = GenerationResult::from_model_text("SELECT * FROM claims").unwrap_err();
        assert!(matches!(err, LlmError::ResponseError(_)));
    }

    #[test]
    fn rejects_invalid_json() {
        let err = GenerationResult::from_model_text("{sql: SELECT 1}").unwrap_err();
        assert!(matches!(err, LlmError::ResponseError(_)));
    }

    #[test]
    fn rejects_missing_or_blank_sql() {
        assert!(GenerationResult::from_model_text(r#"{"explanation": "nothing"}"#).is_err());
        assert!(GenerationResult::from_model_text(r#"{"sql": "   "}"#).is_err());
    }
}
