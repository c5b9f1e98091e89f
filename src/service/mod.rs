//! Entity-level operations composed from the metadata, content and search
//! backends.

mod directory;
mod docs;

pub use directory::Directory;
pub use docs::{DocumentService, ListFilter};

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// When search indexing happens relative to a document write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Index before the write returns. Index failures are reported.
    #[default]
    Sync,
    /// Index on a spawned task. Index failures are logged.
    Background,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub index_mode: IndexMode,
    /// Upper bound on each backend call. `None` waits indefinitely.
    pub op_timeout: Option<Duration>,
}

/// Awaits `fut`, giving up after `limit`. Giving up abandons the wait only;
/// whatever the backend already did stays done.
pub(crate) async fn bounded<T, F>(limit: Option<Duration>, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(format!("{what} exceeded {}ms", limit.as_millis())))?,
        None => fut.await,
    }
}
