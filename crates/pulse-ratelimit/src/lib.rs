//! Fixed-window request throttling backed by Redis.
//!
//! Quotas are enforced along three scopes — global, per-client, and per-tool —
//! with short-circuit evaluation and fail-open behavior when the counting
//! backend is unreachable. Counters live in Redis buckets that expire on
//! their own; nothing is stored in process memory.

pub mod backend;
pub mod config;
pub mod error;
pub mod guard;
pub mod key;
pub mod limiter;

pub use backend::{CounterBackend, RedisBackend};
pub use config::RateLimitConfig;
pub use error::{RateLimitError, RateLimitResult};
pub use guard::{RateLimitRejection, ToolGuard};
pub use key::Window;
pub use limiter::{LimitCheck, LimitType, RateLimitDecision, RateLimiter};
