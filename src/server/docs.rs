use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{ListDocsParams, PathResponse, RemoveDocParams, SearchParams};
use crate::server::response::{ApiError, ApiResponse};
use crate::service::ListFilter;
use crate::types::Doc;

pub fn docs_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/docs", get(list_docs).post(put_doc))
        .route("/docs/{*path}", get(get_doc).delete(remove_doc))
        .route("/tags/{*path}", post(tag_doc))
        .route("/pins/{*path}", post(pin_doc))
        .route("/search", get(search))
}

/// Wildcard captures arrive without the leading slash.
fn doc_path(captured: &str) -> String {
    format!("/{}", captured.trim_start_matches('/'))
}

async fn put_doc(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Json(doc): Json<Doc>,
) -> impl IntoResponse {
    let path = state.docs.put_doc(doc, &user).await.map_err(ApiError::from)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(PathResponse { path })),
    ))
}

async fn get_doc(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> impl IntoResponse {
    let doc = state
        .docs
        .get_doc(&doc_path(&path), &user)
        .await
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(doc)))
}

async fn list_docs(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListDocsParams>,
) -> impl IntoResponse {
    let filter = ListFilter::parse(params.query.as_deref().unwrap_or_default());
    let docs = state
        .docs
        .list(filter, &params.tag_list(), &user)
        .await
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(docs)))
}

async fn search(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let docs = state
        .docs
        .search(&params.q, &user)
        .await
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(docs)))
}

async fn remove_doc(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(params): Query<RemoveDocParams>,
) -> impl IntoResponse {
    let path = doc_path(&path);
    let removed = if params.purge.unwrap_or(false) {
        state.docs.purge_doc(&path, &user).await
    } else {
        state.docs.remove_doc(&path, &user).await
    };
    removed.map_err(ApiError::from)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

async fn tag_doc(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Json(tags): Json<Vec<String>>,
) -> impl IntoResponse {
    let doc = state
        .docs
        .tag_doc(&doc_path(&path), tags, &user)
        .await
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(doc)))
}

async fn pin_doc(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> impl IntoResponse {
    let doc = state
        .docs
        .pin_doc(&doc_path(&path), &user)
        .await
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(doc)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_path_restores_leading_slash() {
        assert_eq!(doc_path("wiki/intro"), "/wiki/intro");
        assert_eq!(doc_path("/wiki"), "/wiki");
    }
}
