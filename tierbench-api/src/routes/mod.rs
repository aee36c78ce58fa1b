//! REST API Routes Module
//!
//! - `/users` CRUD over the cache-aside access layer
//! - `/health` tier connectivity check

pub mod health;
pub mod users;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router with request tracing.
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .nest("/users", users::create_router())
        .merge(health::create_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
