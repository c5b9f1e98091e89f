//! Full-text search over document content.

mod search;

pub use search::SearchIndex;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Indexer: Send + Sync {
    /// Indexes `text` under `path`, replacing anything indexed there before.
    async fn index(&self, path: &str, text: &str) -> Result<()>;

    /// Drops `path` from the index. Removing an unindexed path is not an error.
    async fn remove(&self, path: &str) -> Result<()>;

    /// Paths whose content matches `query`, best match first.
    async fn search(&self, query: &str) -> Result<Vec<String>>;
}
