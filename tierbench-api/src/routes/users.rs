//! User REST API Routes
//!
//! Thin handlers over `RecordAccessLayer`; all caching and invalidation
//! happens in the layer.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tierbench_core::RecordId;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    validation::CreateUserRequest,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /users - List all users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let users = state.layer.get_all().await?;
    Ok(Json(users))
}

/// GET /users/:id - Fetch one user
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .layer
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("User", id))?;
    Ok(Json(user))
}

/// POST /users - Create a user
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let (name, email) = req.validate()?;
    let user = state.layer.create(&name, &email).await?;
    tracing::info!(id = user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// DELETE /users/:id - Delete a user
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> ApiResult<StatusCode> {
    if state.layer.delete(id).await? {
        tracing::info!(id, "User deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::entity_not_found("User", id))
    }
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", axum::routing::get(list_users))
        .route("/", axum::routing::post(create_user))
        .route("/:id", axum::routing::get(get_user))
        .route("/:id", axum::routing::delete(delete_user))
}
