use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::orchestrator::PromptQlError;

/// JSON error body plus status, in the shape the client expects.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiError {
    pub fn missing_field(field: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": format!("{} is required", field) }),
        }
    }

    pub fn invalid_json(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": "Invalid JSON body", "message": message }),
        }
    }

    /// `failure` labels 500 responses for the endpoint that was called.
    pub fn from_promptql(err: PromptQlError, failure: &str) -> Self {
        match err {
            PromptQlError::Validation { errors, sql: Some(sql) } => Self {
                status: StatusCode::BAD_REQUEST,
                body: json!({
                    "error": "Generated SQL failed validation",
                    "validationErrors": errors,
                    "sql": sql,
                }),
            },
            PromptQlError::Validation { errors, sql: None } => Self {
                status: StatusCode::BAD_REQUEST,
                body: json!({
                    "error": "SQL validation failed",
                    "validationErrors": errors,
                }),
            },
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: json!({ "error": failure, "message": other.to_string() }),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
