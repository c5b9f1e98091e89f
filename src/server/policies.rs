use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::IdResponse;
use crate::server::response::{ApiError, ApiResponse};
use crate::types::Policy;

pub fn policies_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/policies", post(put_policy))
        .route("/policies/{id}", get(get_policy).delete(remove_policy))
}

async fn put_policy(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Json(policy): Json<Policy>,
) -> impl IntoResponse {
    let id = state.directory.put_policy(policy, &user).await.map_err(ApiError::from)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(IdResponse { id })),
    ))
}

async fn get_policy(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let policy = state.directory.get_policy(&id, &user).await.map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(policy)))
}

async fn remove_policy(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.directory.remove_policy(&id, &user).await.map_err(ApiError::from)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
