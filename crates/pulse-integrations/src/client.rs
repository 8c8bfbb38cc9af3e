//! The request wrapper shared by every vendor client.

use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, warn};

use pulse_resilience::{BreakerError, CircuitBreaker, CircuitBreakerConfig, FailureKind};

use crate::auth::Credential;
use crate::error::{IntegrationError, IntegrationResult};

/// Per-integration configuration.
#[derive(Debug, Clone)]
pub struct IntegrationConfig {
    /// Base URL all paths are joined against.
    pub base_url: String,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Cooldown before the circuit probes recovery.
    pub breaker_timeout: Duration,
    /// Whether request timeouts count against the circuit breaker.
    pub penalize_timeouts: bool,
}

impl IntegrationConfig {
    /// Config for a vendor API with default breaker settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            failure_threshold: 5,
            breaker_timeout: Duration::from_secs(60),
            penalize_timeouts: true,
        }
    }
}

/// HTTP client for one vendor integration.
///
/// Owns its circuit breaker; all requests for this integration instance
/// flow through it, and nothing else touches the breaker.
#[derive(Debug)]
pub struct IntegrationClient {
    name: String,
    config: IntegrationConfig,
    credential: Credential,
    http: Client,
    breaker: CircuitBreaker,
}

impl IntegrationClient {
    /// Create a client. Fails with a validation error on empty credentials.
    pub fn new(
        name: impl Into<String>,
        config: IntegrationConfig,
        credential: Credential,
    ) -> IntegrationResult<Self> {
        credential.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| IntegrationError::network(e.to_string()))?;

        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: config.failure_threshold,
            timeout: config.breaker_timeout,
        });

        Ok(Self {
            name: name.into(),
            config,
            credential,
            http,
            breaker,
        })
    }

    /// Integration name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Breaker handle for observability.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Issue a request through the circuit breaker.
    ///
    /// 200/201/202 parse the JSON body, 204 yields `Value::Null`, and any
    /// other status (or a network failure) is recorded as a breaker failure
    /// and surfaced as an [`IntegrationError::Api`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: &[(&str, &str)],
    ) -> IntegrationResult<Value> {
        let url = self.join_url(path);
        debug!(integration = %self.name, %method, %url, "issuing request");

        let penalize_timeouts = self.config.penalize_timeouts;
        let result = self
            .breaker
            .call_with_classifier(
                || self.execute(method, &url, body, query),
                move |err: &IntegrationError| {
                    if !penalize_timeouts && matches!(err, IntegrationError::Timeout(_)) {
                        FailureKind::Neutral
                    } else {
                        FailureKind::Counted
                    }
                },
            )
            .await;

        match result {
            Ok(value) => Ok(value),
            Err(BreakerError::CircuitOpen) => {
                warn!(integration = %self.name, "request rejected: circuit open");
                Err(IntegrationError::CircuitOpen {
                    integration: self.name.clone(),
                })
            }
            Err(BreakerError::Inner(err)) => Err(err),
        }
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        query: &[(&str, &str)],
    ) -> IntegrationResult<Value> {
        let mut request = self.http.request(method, url);
        request = self.credential.apply(request);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                IntegrationError::Timeout(e.to_string())
            } else {
                IntegrationError::network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        match status {
            200 | 201 | 202 => response
                .json()
                .await
                .map_err(|e| IntegrationError::api(status, format!("invalid JSON body: {e}"))),
            204 => Ok(Value::Null),
            _ => {
                let detail = response.text().await.unwrap_or_default();
                warn!(integration = %self.name, status, "vendor API returned error");
                Err(IntegrationError::api(status, detail))
            }
        }
    }

    fn join_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> IntegrationClient {
        IntegrationClient::new(
            "test",
            IntegrationConfig::new(base_url),
            Credential::Bearer("token".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn url_join_handles_slashes() {
        let c = client("https://api.example.com/");
        assert_eq!(
            c.join_url("/v1/things"),
            "https://api.example.com/v1/things"
        );
        assert_eq!(c.join_url("v1/things"), "https://api.example.com/v1/things");
    }

    #[test]
    fn empty_credential_is_rejected_at_construction() {
        let result = IntegrationClient::new(
            "test",
            IntegrationConfig::new("https://api.example.com"),
            Credential::Bearer(String::new()),
        );
        assert!(matches!(
            result.unwrap_err(),
            IntegrationError::Validation(_)
        ));
    }
}
