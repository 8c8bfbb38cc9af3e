//! Request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub rate_limit_backend: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Readiness check endpoint (readiness probe).
/// Checks connectivity to the rate limit backend; a disabled limiter is
/// reported ready since enforcement fails open anyway.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let backend_check = match state.limiter.ping().await {
        Ok(()) => CheckStatus {
            status: "ok".to_string(),
            error: None,
        },
        Err(e) => CheckStatus {
            status: "error".to_string(),
            error: Some(e.to_string()),
        },
    };

    let all_ok = backend_check.status == "ok";
    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            rate_limit_backend: backend_check,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

/// Dispatch a tool invocation to the backing integration.
///
/// The rate limit stage has already run by the time this executes.
pub async fn invoke_tool(
    State(state): State<AppState>,
    Path(tool): Path<String>,
    Json(params): Json<Value>,
) -> ApiResult<Json<Value>> {
    metrics::record_tool_call(&tool);

    let result = match tool.as_str() {
        "slack.post_message" => {
            let slack = state.slack.as_ref().ok_or(ApiError::NotConfigured("slack"))?;
            let channel = required_str(&params, "channel")?;
            let text = required_str(&params, "text")?;
            slack.post_message(channel, text).await?
        }
        "zendesk.create_ticket" => {
            let zendesk = state
                .zendesk
                .as_ref()
                .ok_or(ApiError::NotConfigured("zendesk"))?;
            let subject = required_str(&params, "subject")?;
            let comment = required_str(&params, "comment")?;
            let priority = params.get("priority").and_then(Value::as_str);
            zendesk.create_ticket(subject, comment, priority).await?
        }
        _ => return Err(ApiError::UnknownTool(tool)),
    };

    Ok(Json(json!({ "status": "ok", "tool": tool, "result": result })))
}

fn required_str<'a>(params: &'a Value, field: &str) -> ApiResult<&'a str> {
    params
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request(format!("missing required field '{field}'")))
}
