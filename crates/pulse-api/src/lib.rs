//! Axum HTTP API server.
//!
//! This crate wires the pieces together:
//! - Rate limiting middleware in front of tool dispatch
//! - Circuit-broken vendor integrations
//! - Prometheus metrics and health probes

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
