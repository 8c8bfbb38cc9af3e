//! Credential material for vendor APIs.

use crate::error::{IntegrationError, IntegrationResult};

/// How a vendor expects its auth material delivered.
#[derive(Clone, Debug)]
pub enum Credential {
    /// `Authorization: Bearer <token>` (Slack, Zendesk OAuth, Help Scout).
    Bearer(String),
    /// API key in a vendor-specific header (Paddle, Heap).
    ApiKey { header: String, key: String },
    /// API key embedded as a query parameter (Nicereply).
    QueryKey { param: String, key: String },
}

impl Credential {
    /// Reject empty credential material before any network interaction.
    pub fn validate(&self) -> IntegrationResult<()> {
        let ok = match self {
            Credential::Bearer(token) => !token.trim().is_empty(),
            Credential::ApiKey { header, key } => {
                !header.trim().is_empty() && !key.trim().is_empty()
            }
            Credential::QueryKey { param, key } => {
                !param.trim().is_empty() && !key.trim().is_empty()
            }
        };
        if ok {
            Ok(())
        } else {
            Err(IntegrationError::validation(
                "credential material must not be empty",
            ))
        }
    }

    /// Apply the credential to a request builder.
    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Credential::Bearer(token) => request.bearer_auth(token),
            Credential::ApiKey { header, key } => request.header(header.as_str(), key.as_str()),
            Credential::QueryKey { param, key } => {
                request.query(&[(param.as_str(), key.as_str())])
            }
        }
    }
}
