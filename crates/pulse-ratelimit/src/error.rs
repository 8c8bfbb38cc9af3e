//! Rate limiter error types.

use thiserror::Error;

pub type RateLimitResult<T> = Result<T, RateLimitError>;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl RateLimitError {
    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }
}
