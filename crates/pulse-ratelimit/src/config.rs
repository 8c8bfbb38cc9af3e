//! Rate limiter configuration.

/// Rate limiter configuration.
///
/// Without a `redis_url` the limiter is effectively disabled: every check
/// allows the request (fail-open at the configuration level).
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Master switch; when false every check trivially allows.
    pub enabled: bool,
    /// Global requests per minute across all clients.
    pub max_requests_per_minute: u64,
    /// Global requests per hour across all clients.
    pub max_requests_per_hour: u64,
    /// Per-client requests per minute. The per-hour client allowance is
    /// derived as this value times 60.
    pub per_client_per_minute: u64,
    /// Per-tool requests per minute.
    pub per_tool_per_minute: u64,
    /// Redis connection URL; `None` disables rate limiting entirely.
    pub redis_url: Option<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests_per_minute: 1000,
            max_requests_per_hour: 10_000,
            per_client_per_minute: 100,
            per_tool_per_minute: 100,
            redis_url: Some("redis://localhost:6379".to_string()),
        }
    }
}

impl RateLimitConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("RATE_LIMIT_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            max_requests_per_minute: std::env::var("MAX_REQUESTS_PER_MINUTE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
            max_requests_per_hour: std::env::var("MAX_REQUESTS_PER_HOUR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10_000),
            per_client_per_minute: std::env::var("RATE_LIMIT_PER_CLIENT_PER_MINUTE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            per_tool_per_minute: std::env::var("RATE_LIMIT_PER_TOOL_PER_MINUTE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            redis_url: std::env::var("REDIS_URL").ok(),
        }
    }

    /// Per-hour client allowance, scaled from the per-minute bound.
    pub fn per_client_per_hour(&self) -> u64 {
        self.per_client_per_minute * 60
    }
}
