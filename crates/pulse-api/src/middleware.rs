//! API middleware.

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{info, warn};

use pulse_ratelimit::RateLimitRejection;

use crate::metrics;
use crate::state::AppState;

/// Paths exempt from rate limiting (probes and metric scrapes).
fn is_exempt(path: &str) -> bool {
    matches!(path, "/health" | "/ready" | "/metrics")
}

/// Rate limiting pipeline stage.
///
/// Runs before tool dispatch: extracts the client id from `X-Client-Id`
/// and the tool name from the request path, consults the shared limiter,
/// and short-circuits with a 429 envelope when a quota is exhausted.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let path = request.uri().path().to_string();
    if is_exempt(&path) {
        return next.run(request).await;
    }

    let client_id = request
        .headers()
        .get("X-Client-Id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string();
    let tool_name = path.rsplit('/').next().unwrap_or("unknown").to_string();

    let decision = state.limiter.check_all_limits(&client_id, &tool_name).await;
    if !decision.allowed {
        let limit_type = decision
            .limit_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        warn!(tool = %tool_name, %limit_type, "rate limit exceeded");
        metrics::record_rate_limit_hit(&tool_name, &limit_type);

        let retry_after = decision.retry_after.unwrap_or(0);
        let rejection = RateLimitRejection::from_decision(&decision);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after.to_string())],
            Json(rejection),
        )
            .into_response();
    }

    next.run(request).await
}

/// Request logging middleware.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let duration = start.elapsed();

    // Skip health check logging
    if uri.path() != "/health" && uri.path() != "/ready" {
        info!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}
