//! Application state.

use std::sync::Arc;

use tracing::info;

use pulse_integrations::{SlackClient, ZendeskClient};
use pulse_ratelimit::RateLimiter;

use crate::config::ApiConfig;

/// Shared application state.
///
/// The rate limiter is constructed here and injected everywhere it is
/// needed; there is no process-global instance.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub limiter: Arc<RateLimiter>,
    pub slack: Option<Arc<SlackClient>>,
    pub zendesk: Option<Arc<ZendeskClient>>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone())?);
        if !limiter.is_enabled() {
            info!("rate limiting disabled");
        }

        let slack = match std::env::var("SLACK_BOT_TOKEN") {
            Ok(token) => Some(Arc::new(SlackClient::new(&token)?)),
            Err(_) => None,
        };

        let zendesk = match (
            std::env::var("ZENDESK_SUBDOMAIN"),
            std::env::var("ZENDESK_ACCESS_TOKEN"),
        ) {
            (Ok(subdomain), Ok(token)) => Some(Arc::new(ZendeskClient::new(&subdomain, &token)?)),
            _ => None,
        };

        info!(
            slack = slack.is_some(),
            zendesk = zendesk.is_some(),
            "integrations configured"
        );

        Ok(Self {
            config,
            limiter,
            slack,
            zendesk,
        })
    }
}
