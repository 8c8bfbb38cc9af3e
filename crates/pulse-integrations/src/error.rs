//! Integration error types.

use thiserror::Error;

pub type IntegrationResult<T> = Result<T, IntegrationError>;

#[derive(Debug, Error)]
pub enum IntegrationError {
    /// Non-2xx response or network-level failure. `status` is `None` for
    /// failures below HTTP (DNS, connection refused).
    #[error("API request failed ({}): {detail}", status_label(.status))]
    Api { status: Option<u16>, detail: String },

    /// The request timed out before the vendor answered.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The integration's circuit is open; no request was attempted.
    #[error("{integration} unavailable: circuit open")]
    CircuitOpen { integration: String },

    /// Credential or session setup problem. Not a transient dependency
    /// failure, so never recorded against the circuit breaker.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Malformed input rejected before any network interaction.
    #[error("validation error: {0}")]
    Validation(String),
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {code}"),
        None => "network error".to_string(),
    }
}

impl IntegrationError {
    pub fn api(status: u16, detail: impl Into<String>) -> Self {
        Self::Api {
            status: Some(status),
            detail: detail.into(),
        }
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::Api {
            status: None,
            detail: detail.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// HTTP status of the failed response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }
}
