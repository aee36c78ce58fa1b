//! Redis Cache Adapter
//!
//! A `CacheStore` over a single multiplexed async connection. The connection
//! is cheap to clone and safe to share across concurrent operations, so the
//! adapter holds nothing else.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError};
use std::time::Duration;
use tierbench_core::{Tier, TierError, TierResult};
use tierbench_storage::CacheStore;
use tokio::time::sleep;
use tracing::{info, warn};

/// Redis connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379/`
    pub url: String,
    /// Additional connection attempts after the first failure
    pub connect_retries: u32,
    /// Delay between connection attempts
    pub retry_delay: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/".to_string(),
            connect_retries: 5,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl RedisConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// - `TIERBENCH_REDIS_URL`
    /// - `TIERBENCH_REDIS_CONNECT_RETRIES`
    /// - `TIERBENCH_REDIS_RETRY_DELAY_SECS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("TIERBENCH_REDIS_URL").unwrap_or(defaults.url),
            connect_retries: std::env::var("TIERBENCH_REDIS_CONNECT_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.connect_retries),
            retry_delay: std::env::var("TIERBENCH_REDIS_RETRY_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_delay),
        }
    }
}

fn map_redis_error(err: RedisError) -> TierError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
        TierError::unavailable(Tier::Cache, err)
    } else {
        TierError::query_failed(Tier::Cache, err)
    }
}

/// `CacheStore` backed by Redis.
#[derive(Clone)]
pub struct RedisCache {
    con: MultiplexedConnection,
}

impl RedisCache {
    /// Wrap an established connection.
    pub fn new(con: MultiplexedConnection) -> Self {
        Self { con }
    }

    /// Connect, retrying while the server is not yet accepting connections.
    pub async fn connect(config: &RedisConfig) -> TierResult<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| TierError::unavailable(Tier::Cache, format!("invalid redis url: {}", e)))?;

        let attempts = config.connect_retries + 1;
        let mut attempt = 1;
        loop {
            match client.get_multiplexed_async_connection().await {
                Ok(con) => {
                    info!(url = %config.url, "Connected to Redis");
                    return Ok(Self::new(con));
                }
                Err(err) if attempt < attempts => {
                    warn!(
                        attempt,
                        attempts,
                        delay = ?config.retry_delay,
                        error = %err,
                        "Failed to connect to Redis, retrying"
                    );
                    attempt += 1;
                    sleep(config.retry_delay).await;
                }
                Err(err) => return Err(map_redis_error(err)),
            }
        }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> TierResult<Option<String>> {
        let mut con = self.con.clone();
        con.get::<_, Option<String>>(key).await.map_err(map_redis_error)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> TierResult<()> {
        let mut con = self.con.clone();
        con.set_ex::<_, _, ()>(key, value, ttl_seconds.max(1))
            .await
            .map_err(map_redis_error)
    }

    async fn delete(&self, key: &str) -> TierResult<()> {
        let mut con = self.con.clone();
        con.del::<_, ()>(key).await.map_err(map_redis_error)
    }

    async fn flush_all(&self) -> TierResult<()> {
        let mut con = self.con.clone();
        redis::cmd("FLUSHALL")
            .query_async::<()>(&mut con)
            .await
            .map_err(map_redis_error)
    }

    async fn ping(&self) -> TierResult<()> {
        let mut con = self.con.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut con)
            .await
            .map(|_| ())
            .map_err(map_redis_error)
    }
}
