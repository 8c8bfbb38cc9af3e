//! Composite rate limiter.
//!
//! Three independent quotas are evaluated in order — global, per-client,
//! per-tool — short-circuiting on the first violation so the cheapest,
//! most global check sheds load before any per-entity work. Backend
//! failures never block traffic: the limiter fails open and logs.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::{CounterBackend, RedisBackend};
use crate::config::RateLimitConfig;
use crate::error::RateLimitResult;
use crate::key::{bucket_key, unix_now, Window};

/// Which quota rejected a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitType {
    Global,
    PerClient,
    PerTool,
}

impl std::fmt::Display for LimitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LimitType::Global => "global",
            LimitType::PerClient => "per_client",
            LimitType::PerTool => "per_tool",
        };
        f.write_str(s)
    }
}

/// Outcome of a composite rate check. Produced fresh per call, never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit_type: Option<LimitType>,
    pub retry_after: Option<u64>,
}

impl RateLimitDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            limit_type: None,
            retry_after: None,
        }
    }

    pub fn denied(limit_type: LimitType, retry_after: u64) -> Self {
        Self {
            allowed: false,
            limit_type: Some(limit_type),
            retry_after: Some(retry_after),
        }
    }
}

/// Outcome of a single-quota check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitCheck {
    Allowed,
    Denied { retry_after: u64 },
}

/// Fixed-window rate limiter over a shared counter backend.
///
/// Constructed explicitly and injected into the application state; there is
/// no process-global instance.
pub struct RateLimiter {
    config: RateLimitConfig,
    backend: Option<Arc<dyn CounterBackend>>,
}

impl RateLimiter {
    /// Create a limiter from config, connecting to Redis if configured.
    pub fn new(config: RateLimitConfig) -> RateLimitResult<Self> {
        let backend = match (&config.redis_url, config.enabled) {
            (Some(url), true) => {
                let backend: Arc<dyn CounterBackend> = Arc::new(RedisBackend::new(url)?);
                Some(backend)
            }
            _ => {
                debug!("rate limiting disabled (no backend configured or switched off)");
                None
            }
        };
        Ok(Self { config, backend })
    }

    /// Create a limiter over an explicit backend (used by tests).
    pub fn with_backend(config: RateLimitConfig, backend: Arc<dyn CounterBackend>) -> Self {
        Self {
            config,
            backend: Some(backend),
        }
    }

    /// A limiter that allows everything.
    pub fn disabled() -> Self {
        Self {
            config: RateLimitConfig {
                enabled: false,
                redis_url: None,
                ..RateLimitConfig::default()
            },
            backend: None,
        }
    }

    /// Whether enforcement is active.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.backend.is_some()
    }

    /// Probe backend connectivity (readiness checks).
    pub async fn ping(&self) -> RateLimitResult<()> {
        match &self.backend {
            Some(backend) => backend.ping().await,
            None => Ok(()),
        }
    }

    /// Check-and-increment a single quota for `identifier`.
    ///
    /// Counts the request against the current window bucket, then compares
    /// with `limit`. Backend errors fail open.
    pub async fn check_limit(
        &self,
        identifier: &str,
        limit: u64,
        window: Window,
        ttl_secs: u64,
    ) -> LimitCheck {
        self.check_limit_at(unix_now(), identifier, limit, window, ttl_secs)
            .await
    }

    async fn check_limit_at(
        &self,
        now: u64,
        identifier: &str,
        limit: u64,
        window: Window,
        ttl_secs: u64,
    ) -> LimitCheck {
        let Some(backend) = &self.backend else {
            return LimitCheck::Allowed;
        };

        let key = bucket_key(identifier, window, now);
        match backend.incr(&key, ttl_secs).await {
            Ok(count) if count > limit => {
                let retry_after = match backend.ttl(&key).await {
                    Ok(ttl) => ttl.max(0) as u64,
                    Err(_) => 0,
                };
                debug!(
                    window = window.as_str(),
                    count, limit, "rate limit bucket exhausted"
                );
                LimitCheck::Denied { retry_after }
            }
            Ok(_) => LimitCheck::Allowed,
            Err(e) => {
                // Fail open: availability beats strict enforcement when the
                // counting backend is down.
                warn!(error = %e, "rate limit backend unreachable, allowing request");
                LimitCheck::Allowed
            }
        }
    }

    /// Evaluate all quotas for one tool call, short-circuiting on the first
    /// violation: global minute, global hour, client minute, client hour,
    /// tool minute.
    pub async fn check_all_limits(&self, client_id: &str, tool_name: &str) -> RateLimitDecision {
        if !self.is_enabled() {
            return RateLimitDecision::allowed();
        }
        self.check_all_limits_at(unix_now(), client_id, tool_name)
            .await
    }

    async fn check_all_limits_at(
        &self,
        now: u64,
        client_id: &str,
        tool_name: &str,
    ) -> RateLimitDecision {
        let global_checks = [
            (self.config.max_requests_per_minute, Window::Minute),
            (self.config.max_requests_per_hour, Window::Hour),
        ];
        for (limit, window) in global_checks {
            if let LimitCheck::Denied { retry_after } = self
                .check_limit_at(now, "global", limit, window, window.seconds())
                .await
            {
                return RateLimitDecision::denied(LimitType::Global, retry_after);
            }
        }

        let client_key = format!("client:{client_id}");
        let client_checks = [
            (self.config.per_client_per_minute, Window::Minute),
            (self.config.per_client_per_hour(), Window::Hour),
        ];
        for (limit, window) in client_checks {
            if let LimitCheck::Denied { retry_after } = self
                .check_limit_at(now, &client_key, limit, window, window.seconds())
                .await
            {
                return RateLimitDecision::denied(LimitType::PerClient, retry_after);
            }
        }

        let tool_key = format!("tool:{tool_name}");
        if let LimitCheck::Denied { retry_after } = self
            .check_limit_at(
                now,
                &tool_key,
                self.config.per_tool_per_minute,
                Window::Minute,
                Window::Minute.seconds(),
            )
            .await
        {
            return RateLimitDecision::denied(LimitType::PerTool, retry_after);
        }

        RateLimitDecision::allowed()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::backend::CounterBackend;
    use crate::error::{RateLimitError, RateLimitResult};

    /// In-memory counter store. TTLs are recorded but only enforced through
    /// key rotation (each window produces a distinct key).
    #[derive(Default)]
    pub struct InMemoryBackend {
        counters: Mutex<HashMap<String, (u64, u64)>>,
    }

    #[async_trait]
    impl CounterBackend for InMemoryBackend {
        async fn incr(&self, key: &str, ttl_secs: u64) -> RateLimitResult<u64> {
            let mut counters = self.counters.lock().unwrap();
            let entry = counters.entry(key.to_string()).or_insert((0, ttl_secs));
            entry.0 += 1;
            Ok(entry.0)
        }

        async fn ttl(&self, key: &str) -> RateLimitResult<i64> {
            let counters = self.counters.lock().unwrap();
            Ok(counters.get(key).map(|(_, ttl)| *ttl as i64).unwrap_or(-2))
        }

        async fn ping(&self) -> RateLimitResult<()> {
            Ok(())
        }
    }

    /// Backend that fails every operation, for fail-open tests.
    pub struct FailingBackend;

    #[async_trait]
    impl CounterBackend for FailingBackend {
        async fn incr(&self, _key: &str, _ttl_secs: u64) -> RateLimitResult<u64> {
            Err(RateLimitError::backend_unavailable("connection refused"))
        }

        async fn ttl(&self, _key: &str) -> RateLimitResult<i64> {
            Err(RateLimitError::backend_unavailable("connection refused"))
        }

        async fn ping(&self) -> RateLimitResult<()> {
            Err(RateLimitError::backend_unavailable("connection refused"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FailingBackend, InMemoryBackend};
    use super::*;

    fn limiter_with(config: RateLimitConfig) -> RateLimiter {
        RateLimiter::with_backend(config, Arc::new(InMemoryBackend::default()))
    }

    #[tokio::test]
    async fn allows_up_to_limit_then_denies_with_retry_after() {
        let limiter = limiter_with(RateLimitConfig::default());
        let now = 1_700_000_000;

        for _ in 0..2 {
            let check = limiter
                .check_limit_at(now, "client:alice", 2, Window::Minute, 60)
                .await;
            assert_eq!(check, LimitCheck::Allowed);
        }

        let check = limiter
            .check_limit_at(now, "client:alice", 2, Window::Minute, 60)
            .await;
        match check {
            LimitCheck::Denied { retry_after } => {
                assert!((1..=60).contains(&retry_after));
            }
            LimitCheck::Allowed => panic!("third request should be denied"),
        }
    }

    #[tokio::test]
    async fn next_window_starts_fresh() {
        let limiter = limiter_with(RateLimitConfig::default());
        let now = 1_700_000_000;

        limiter
            .check_limit_at(now, "client:alice", 1, Window::Minute, 60)
            .await;
        let denied = limiter
            .check_limit_at(now, "client:alice", 1, Window::Minute, 60)
            .await;
        assert!(matches!(denied, LimitCheck::Denied { .. }));

        // One window later the bucket key rotates and counting restarts.
        let fresh = limiter
            .check_limit_at(now + 60, "client:alice", 1, Window::Minute, 60)
            .await;
        assert_eq!(fresh, LimitCheck::Allowed);
    }

    #[tokio::test]
    async fn global_violation_reported_before_client() {
        // Both quotas sized so the second request violates them simultaneously.
        let config = RateLimitConfig {
            max_requests_per_minute: 1,
            max_requests_per_hour: 1000,
            per_client_per_minute: 1,
            ..RateLimitConfig::default()
        };
        let limiter = limiter_with(config);

        let first = limiter.check_all_limits_at(0, "alice", "health_score").await;
        assert!(first.allowed);

        let second = limiter.check_all_limits_at(0, "alice", "health_score").await;
        assert!(!second.allowed);
        assert_eq!(second.limit_type, Some(LimitType::Global));
        assert!(second.retry_after.is_some());
    }

    #[tokio::test]
    async fn client_quota_checked_before_tool() {
        let config = RateLimitConfig {
            per_client_per_minute: 1,
            per_tool_per_minute: 1,
            ..RateLimitConfig::default()
        };
        let limiter = limiter_with(config);

        limiter.check_all_limits_at(0, "alice", "health_score").await;
        let second = limiter.check_all_limits_at(0, "alice", "health_score").await;
        assert_eq!(second.limit_type, Some(LimitType::PerClient));
    }

    #[tokio::test]
    async fn tool_quota_rejects_across_clients() {
        let config = RateLimitConfig {
            per_tool_per_minute: 1,
            ..RateLimitConfig::default()
        };
        let limiter = limiter_with(config);

        let first = limiter.check_all_limits_at(0, "alice", "churn_prediction").await;
        assert!(first.allowed);

        // Different client, same tool: the tool bucket is shared.
        let second = limiter.check_all_limits_at(0, "bob", "churn_prediction").await;
        assert_eq!(second.limit_type, Some(LimitType::PerTool));
    }

    #[tokio::test]
    async fn fails_open_when_backend_errors() {
        let limiter = RateLimiter::with_backend(
            RateLimitConfig {
                max_requests_per_minute: 1,
                per_client_per_minute: 1,
                ..RateLimitConfig::default()
            },
            Arc::new(FailingBackend),
        );

        for _ in 0..5 {
            let decision = limiter.check_all_limits("alice", "health_score").await;
            assert_eq!(decision, RateLimitDecision::allowed());
        }
    }

    #[tokio::test]
    async fn disabled_limiter_never_touches_backend() {
        let limiter = RateLimiter {
            config: RateLimitConfig {
                enabled: false,
                ..RateLimitConfig::default()
            },
            backend: Some(Arc::new(FailingBackend)),
        };

        let decision = limiter.check_all_limits("alice", "health_score").await;
        assert_eq!(decision, RateLimitDecision::allowed());
    }
}
