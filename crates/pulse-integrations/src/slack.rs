//! Slack Web API client.

use reqwest::Method;
use serde_json::{json, Value};

use crate::auth::Credential;
use crate::client::{IntegrationClient, IntegrationConfig};
use crate::error::{IntegrationError, IntegrationResult};

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Thin wrapper over the Slack Web API.
pub struct SlackClient {
    inner: IntegrationClient,
}

impl SlackClient {
    /// Create a client with a bot token.
    pub fn new(bot_token: &str) -> IntegrationResult<Self> {
        Self::with_base_url(bot_token, SLACK_API_BASE)
    }

    /// Create a client against an explicit base URL (used by tests).
    pub fn with_base_url(bot_token: &str, base_url: &str) -> IntegrationResult<Self> {
        let inner = IntegrationClient::new(
            "slack",
            IntegrationConfig::new(base_url),
            Credential::Bearer(bot_token.to_string()),
        )?;
        Ok(Self { inner })
    }

    /// Post a message to a channel.
    pub async fn post_message(&self, channel: &str, text: &str) -> IntegrationResult<Value> {
        let body = json!({ "channel": channel, "text": text });
        let response = self
            .inner
            .request(Method::POST, "chat.postMessage", Some(&body), &[])
            .await?;
        Self::check_envelope(response)
    }

    /// Verify the token and fetch workspace identity.
    pub async fn auth_test(&self) -> IntegrationResult<Value> {
        let response = self
            .inner
            .request(Method::POST, "auth.test", None, &[])
            .await?;
        Self::check_envelope(response)
    }

    /// Slack reports API errors inside an `ok: false` envelope with HTTP 200.
    fn check_envelope(response: Value) -> IntegrationResult<Value> {
        if response.get("ok").and_then(Value::as_bool) == Some(false) {
            let reason = response
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            return Err(IntegrationError::api(200, format!("slack: {reason}")));
        }
        Ok(response)
    }
}
