//! Storage for raw document bytes, keyed by normalized document path.

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryContentStore;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fails with `NotFound` if nothing is stored at `path`.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Creates or overwrites the bytes at `path`.
    async fn write(&self, path: &str, content: &[u8]) -> Result<()>;

    /// Fails with `NotFound` if nothing is stored at `path`.
    async fn remove(&self, path: &str) -> Result<()>;

    /// Names of the entries directly beneath `path`, sorted.
    ///
    /// Fails with `InvalidInput` if `path` holds content rather than entries.
    async fn list(&self, path: &str) -> Result<Vec<String>>;
}

fn not_a_directory(path: &str) -> crate::error::Error {
    crate::error::Error::InvalidInput(format!("{path}: not a directory"))
}
