//! Error types for the training API.
//!
//! This module provides custom error types that implement `IntoResponse`
//! for seamless integration with Axum handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::validation::ValidationErrors;

/// PostgreSQL SQLSTATE codes that map to client errors.
const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
const PG_CHECK_VIOLATION: &str = "23514";

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Not found error
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Validation error with per-field messages
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Authorization error
    #[error("Authorization error: {0}")]
    Forbidden(String),

    /// Conflict error (e.g., duplicate enrollment)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad request error
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Auth provider or other upstream failure
    #[error("External service error: {0}")]
    ExternalService(String),
}

impl AppError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        AppError::Validation(errors)
    }

    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(e) => database_status(e),
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) | AppError::Config(_) | AppError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Constraint violations are the caller's fault; everything else is ours.
fn database_status(err: &sqlx::Error) -> StatusCode {
    match err {
        sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(PG_UNIQUE_VIOLATION) => StatusCode::CONFLICT,
            Some(PG_FOREIGN_KEY_VIOLATION) => StatusCode::BAD_REQUEST,
            Some(PG_CHECK_VIOLATION) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_message, fields) = match &self {
            AppError::Database(e) => {
                if status.is_server_error() {
                    tracing::error!(error = %e, "Database error");
                    ("Database error".to_string(), None)
                } else {
                    tracing::debug!(error = %e, "Constraint violation");
                    let message = match e {
                        sqlx::Error::Database(db) => db
                            .constraint()
                            .map(|c| format!("Constraint violated: {}", c))
                            .unwrap_or_else(|| db.message().to_string()),
                        other => other.to_string(),
                    };
                    (message, None)
                }
            }
            AppError::Validation(errors) => (
                "Validation failed".to_string(),
                Some(serde_json::to_value(errors).unwrap_or_default()),
            ),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (msg.clone(), None)
            }
            AppError::Config(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (msg.clone(), None)
            }
            AppError::Serialization(e) => {
                tracing::error!(error = %e, "Serialization error");
                (self.to_string(), None)
            }
            AppError::ExternalService(msg) => {
                tracing::warn!(error = %msg, "External service error");
                (msg.clone(), None)
            }
            AppError::NotFound(msg)
            | AppError::Auth(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg) => (msg.clone(), None),
        };

        let mut body = json!({
            "error": error_message,
            "status": status.as_u16()
        });
        if let Some(fields) = fields {
            body["fields"] = fields;
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<envy::Error> for AppError {
    fn from(err: envy::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalService(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = AppError::NotFound("Course not found".to_string());
        assert_eq!(err.to_string(), "Resource not found: Course not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Auth("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::invalid_field("email", "is required").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::ExternalService("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_validation_response_body() {
        let response = AppError::invalid_field("title", "must not be blank").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], 422);
        assert_eq!(body["fields"]["title"][0], "must not be blank");
    }
}
