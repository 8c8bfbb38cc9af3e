//! Zendesk Support API client.

use reqwest::Method;
use serde_json::{json, Value};

use crate::auth::Credential;
use crate::client::{IntegrationClient, IntegrationConfig};
use crate::error::IntegrationResult;

/// Thin wrapper over the Zendesk Support API.
pub struct ZendeskClient {
    inner: IntegrationClient,
}

impl ZendeskClient {
    /// Create a client for a subdomain with an OAuth access token.
    pub fn new(subdomain: &str, access_token: &str) -> IntegrationResult<Self> {
        let base_url = format!("https://{subdomain}.zendesk.com/api/v2");
        Self::with_base_url(access_token, &base_url)
    }

    /// Create a client against an explicit base URL (used by tests).
    pub fn with_base_url(access_token: &str, base_url: &str) -> IntegrationResult<Self> {
        let inner = IntegrationClient::new(
            "zendesk",
            IntegrationConfig::new(base_url),
            Credential::Bearer(access_token.to_string()),
        )?;
        Ok(Self { inner })
    }

    /// Create a support ticket.
    pub async fn create_ticket(
        &self,
        subject: &str,
        comment: &str,
        priority: Option<&str>,
    ) -> IntegrationResult<Value> {
        let mut ticket = json!({
            "subject": subject,
            "comment": { "body": comment },
        });
        if let Some(priority) = priority {
            ticket["priority"] = json!(priority);
        }
        let body = json!({ "ticket": ticket });
        self.inner
            .request(Method::POST, "tickets.json", Some(&body), &[])
            .await
    }

    /// Fetch a ticket by id.
    pub async fn get_ticket(&self, ticket_id: u64) -> IntegrationResult<Value> {
        self.inner
            .request(Method::GET, &format!("tickets/{ticket_id}.json"), None, &[])
            .await
    }
}
