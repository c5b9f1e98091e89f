use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::docs::docs_router;
use super::groups::groups_router;
use super::policies::policies_router;
use super::users::users_router;
use crate::config::ServerConfig;
use crate::content::DiskStore;
use crate::error::Result;
use crate::index::SearchIndex;
use crate::service::{Directory, DocumentService};
use crate::store::{MetadataStore, SqliteStore};

pub struct AppState {
    pub docs: DocumentService,
    pub directory: Directory,
}

/// Opens the metadata store under the configured data directory and
/// provisions its collections. Leaves the search index alone, so this is safe
/// to call while a server holds it.
pub async fn open_store(config: &ServerConfig) -> Result<Arc<dyn MetadataStore>> {
    config.validate()?;
    std::fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::open(config.db_path(), config.collections.clone())?;
    store.ensure_schema().await?;
    Ok(Arc::new(store))
}

impl AppState {
    /// Opens the SQLite, disk and search backends under the configured data
    /// directory and provisions the metadata collections.
    pub async fn open(config: &ServerConfig) -> Result<Self> {
        let store = open_store(config).await?;

        let content = Arc::new(DiskStore::new(&config.data_dir));
        let index = Arc::new(SearchIndex::open(config.index_dir())?);

        Ok(Self {
            docs: DocumentService::new(
                Arc::clone(&store),
                content,
                index,
                config.service_config(),
            ),
            directory: Directory::new(store),
        })
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        response.status().as_u16(),
        start.elapsed().as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(docs_router())
        .merge(users_router())
        .merge(groups_router())
        .merge(policies_router());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
