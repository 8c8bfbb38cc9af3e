//! Counter backends.
//!
//! The limiter delegates cross-process atomicity to the backend's increment
//! primitive. [`RedisBackend`] is the production implementation; tests use
//! in-memory stand-ins.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::error::RateLimitResult;

/// Timeout for connecting to and talking to the backend. Kept short so a
/// degraded backend never stalls request handling.
const BACKEND_TIMEOUT: Duration = Duration::from_secs(2);

/// A key-value store supporting atomic increment with expiry.
#[async_trait]
pub trait CounterBackend: Send + Sync {
    /// Atomically increment the counter at `key`, setting its expiry to
    /// `ttl_secs` if this was the first increment. Returns the new count.
    async fn incr(&self, key: &str, ttl_secs: u64) -> RateLimitResult<u64>;

    /// Remaining TTL of `key` in seconds (negative if absent or persistent).
    async fn ttl(&self, key: &str) -> RateLimitResult<i64>;

    /// Connectivity probe for readiness checks.
    async fn ping(&self) -> RateLimitResult<()>;
}

/// Redis-backed counter store.
pub struct RedisBackend {
    client: redis::Client,
}

impl RedisBackend {
    /// Create a backend from a Redis URL.
    pub fn new(redis_url: &str) -> RateLimitResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> RateLimitResult<redis::aio::MultiplexedConnection> {
        let conn = self
            .client
            .get_multiplexed_async_connection_with_timeouts(BACKEND_TIMEOUT, BACKEND_TIMEOUT)
            .await?;
        Ok(conn)
    }
}

#[async_trait]
impl CounterBackend for RedisBackend {
    async fn incr(&self, key: &str, ttl_secs: u64) -> RateLimitResult<u64> {
        let mut conn = self.connection().await?;
        let count: u64 = conn.incr(key, 1).await?;
        if count == 1 {
            conn.expire::<_, ()>(key, ttl_secs as i64).await?;
        }
        Ok(count)
    }

    async fn ttl(&self, key: &str) -> RateLimitResult<i64> {
        let mut conn = self.connection().await?;
        let ttl: i64 = conn.ttl(key).await?;
        Ok(ttl)
    }

    async fn ping(&self) -> RateLimitResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}
