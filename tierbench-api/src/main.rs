//! TIERBENCH API Server Entry Point
//!
//! Connects PostgreSQL and Redis from environment configuration and serves
//! the `/users` and `/health` routes until Ctrl-C.

use std::sync::Arc;

use axum::Router;
use tierbench_api::telemetry::{init_tracing, TelemetryConfig};
use tierbench_api::{connect_backends, create_api_router, ApiError, ApiResult, AppState, ServerConfig};
use tierbench_storage::{CacheStore, DurableStore};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::from_env("tierbench-api"))?;

    let (durable, cache, access_config) = connect_backends().await?;
    let durable: Arc<dyn DurableStore> = durable;
    let cache: Arc<dyn CacheStore> = cache;
    let state = AppState::from_adapters(durable, cache, access_config);

    let app: Router = create_api_router(state);

    let addr = ServerConfig::from_env().bind_addr()?;
    tracing::info!(%addr, "Starting TIERBENCH API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
