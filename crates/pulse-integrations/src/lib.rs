//! Vendor API clients over a shared request wrapper.
//!
//! Every vendor client is the same thin shape: join a path against a base
//! URL, apply credentials, issue the call through the client's circuit
//! breaker, and normalize the outcome. [`IntegrationClient`] implements
//! that shape once; the vendor modules only describe request payloads.

pub mod auth;
pub mod client;
pub mod error;
pub mod slack;
pub mod zendesk;

pub use auth::Credential;
pub use client::{IntegrationClient, IntegrationConfig};
pub use error::{IntegrationError, IntegrationResult};
pub use slack::SlackClient;
pub use zendesk::ZendeskClient;
