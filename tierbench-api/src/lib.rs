//! TIERBENCH API - Backends, HTTP Routes and Binaries
//!
//! Wires the storage traits to real backends and exposes them:
//! - `PgStore`: `DurableStore` over a deadpool-postgres pool
//! - `RedisCache`: `CacheStore` over a multiplexed Redis connection
//! - an axum router with `/users` CRUD and `/health`
//!
//! Two binaries build on this crate: `tierbench-api` serves the router and
//! `tierbench-run` runs the read benchmark against both backends.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod validation;

pub use cache::{RedisCache, RedisConfig};
pub use config::ServerConfig;
pub use db::{DbConfig, PgStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
pub use state::{AppState, SharedLayer};
pub use validation::CreateUserRequest;

use std::sync::Arc;

use tierbench_core::{AccessConfig, TierResult};
use tierbench_storage::{CacheStore, DurableStore};

/// Connect both backends from environment configuration and make sure the
/// users table exists.
pub async fn connect_backends() -> TierResult<(Arc<PgStore>, Arc<RedisCache>, AccessConfig)> {
    let durable = Arc::new(PgStore::from_config(&DbConfig::from_env())?);
    durable.ensure_schema().await?;

    let cache = Arc::new(RedisCache::connect(&RedisConfig::from_env()).await?);
    cache.ping().await?;

    Ok((durable, cache, AccessConfig::from_env()))
}
