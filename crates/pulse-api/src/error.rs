//! API error types.
//!
//! Every error renders as the tool-layer envelope: `status`, `error`,
//! `error_code`, so orchestration clients see one uniform shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use pulse_integrations::IntegrationError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Integration not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UnknownTool(_) => StatusCode::NOT_FOUND,
            ApiError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Integration(err) => match err {
                IntegrationError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
                IntegrationError::Authentication(_) => StatusCode::UNAUTHORIZED,
                IntegrationError::Validation(_) => StatusCode::BAD_REQUEST,
                IntegrationError::Api { .. } | IntegrationError::Timeout(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::UnknownTool(_) => "UNKNOWN_TOOL",
            ApiError::NotConfigured(_) => "INTEGRATION_NOT_CONFIGURED",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Integration(err) => match err {
                IntegrationError::CircuitOpen { .. } => "CIRCUIT_OPEN",
                IntegrationError::Authentication(_) => "AUTHENTICATION_FAILED",
                IntegrationError::Validation(_) => "VALIDATION_ERROR",
                IntegrationError::Timeout(_) => "UPSTREAM_TIMEOUT",
                IntegrationError::Api { .. } => "UPSTREAM_ERROR",
            },
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    status: &'static str,
    error: String,
    error_code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let error = match &self {
            ApiError::Internal(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorEnvelope {
            status: "error",
            error,
            error_code: self.error_code(),
        };

        (status, Json(body)).into_response()
    }
}
