use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{CreateUserRequest, CreateUserResponse};
use crate::server::response::{ApiError, ApiResponse};

pub fn users_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).delete(remove_user))
}

async fn list_users(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let users = state.directory.list_users().await.map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(users)))
}

async fn create_user(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    let (user, token) = state
        .directory
        .create_user(&req.email, &req.name)
        .await
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateUserResponse { user, token })),
    ))
}

async fn get_user(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = state.directory.get_user(&id).await.map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

async fn remove_user(
    RequireUser(acting): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if acting.id != id {
        return Err(ApiError::forbidden("Users can only remove themselves"));
    }
    state.directory.remove_user(&id).await.map_err(ApiError::from)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
