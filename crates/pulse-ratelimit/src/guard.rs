//! Tool-call interception.
//!
//! A pipeline stage that consults the limiter before invoking the next
//! stage. Rejections are returned as a structured envelope matching the
//! response shape of the surrounding tool layer, not as an error the
//! caller has to unwind.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::limiter::{LimitType, RateLimitDecision, RateLimiter};

/// Structured rejection envelope returned instead of invoking the tool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RateLimitRejection {
    pub status: String,
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_type: Option<LimitType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl RateLimitRejection {
    /// Build the envelope for a denying decision.
    pub fn from_decision(decision: &RateLimitDecision) -> Self {
        let scope = decision
            .limit_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            status: "error".to_string(),
            error: format!("Rate limit exceeded ({scope})"),
            error_code: "RATE_LIMIT_EXCEEDED".to_string(),
            limit_type: decision.limit_type,
            retry_after: decision.retry_after,
        }
    }
}

/// Rate-limiting stage for tool invocations.
///
/// Holds a shared limiter; the tool host wraps each operation in
/// [`run`](Self::run) so quota enforcement stays independent of how the
/// individual tools are implemented.
#[derive(Clone)]
pub struct ToolGuard {
    limiter: Arc<RateLimiter>,
}

impl ToolGuard {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }

    /// Run `op` if the composite quota allows it.
    ///
    /// On rejection the operation is never constructed and the rejection
    /// envelope is returned. On acceptance the operation's output is
    /// returned unchanged, including its own errors.
    pub async fn run<F, Fut, T>(
        &self,
        client_id: &str,
        tool_name: &str,
        op: F,
    ) -> Result<T, RateLimitRejection>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let decision = self.limiter.check_all_limits(client_id, tool_name).await;
        if !decision.allowed {
            info!(
                tool = tool_name,
                limit_type = ?decision.limit_type,
                retry_after = ?decision.retry_after,
                "tool call rejected by rate limiter"
            );
            return Err(RateLimitRejection::from_decision(&decision));
        }
        Ok(op().await)
    }
}
