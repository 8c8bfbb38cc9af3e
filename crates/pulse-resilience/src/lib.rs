//! Failure isolation for downstream integrations.
//!
//! Each integration client owns one [`CircuitBreaker`]. After a configurable
//! run of consecutive failures the breaker opens and fast-fails callers
//! without touching the network, then probes recovery after a cooldown.

pub mod circuit_breaker;

pub use circuit_breaker::{
    BreakerError, CircuitBreaker, CircuitBreakerConfig, CircuitState, FailureKind,
};
