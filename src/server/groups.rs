use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{IdResponse, MemberRequest};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::Group;

pub fn groups_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/groups", get(list_groups).post(put_group))
        .route("/groups/{id}", get(get_group).delete(remove_group))
        .route("/groups/{id}/members", get(list_members).post(add_member))
        .route("/groups/{id}/members/{user_id}", delete(remove_member))
}

async fn list_groups(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let groups = state.directory.list_groups().await.map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(groups)))
}

async fn put_group(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Json(group): Json<Group>,
) -> impl IntoResponse {
    let id = state.directory.put_group(group, &user).await.map_err(ApiError::from)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(IdResponse { id })),
    ))
}

async fn get_group(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let group = state.directory.get_group(&id).await.map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(group)))
}

async fn remove_group(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.directory.remove_group(&id, &user).await.map_err(ApiError::from)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

async fn list_members(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let members = state.directory.group_members(&id).await.map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(members)))
}

async fn add_member(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<MemberRequest>,
) -> impl IntoResponse {
    let group = state
        .directory
        .add_member(&id, &req.user_id, &user)
        .await
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(group)))
}

async fn remove_member(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path((id, user_id)): Path<(String, String)>,
) -> impl IntoResponse {
    state
        .directory
        .remove_member(&id, &user_id, &user)
        .await
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
