use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ContentStore, not_a_directory};
use crate::error::{Error, Result};
use crate::store::path::{ROOT, normalize_path, normalize_prefix};

/// Content kept in process memory. Directories are implied by stored paths.
#[derive(Default)]
pub struct MemoryContentStore {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryContentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize_path(path)?;
        self.files
            .read()
            .await
            .get(&path)
            .cloned()
            .ok_or_else(|| Error::not_found(&path))
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let path = normalize_path(path)?;
        self.files.write().await.insert(path, content.to_vec());
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let path = normalize_path(path)?;
        match self.files.write().await.remove(&path) {
            Some(_) => Ok(()),
            None => Err(Error::not_found(&path)),
        }
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        let path = normalize_prefix(path)?;
        let files = self.files.read().await;

        let base = if path == ROOT {
            String::from("/")
        } else {
            format!("{path}/")
        };
        let names: BTreeSet<String> = files
            .range(base.clone()..)
            .take_while(|(key, _)| key.starts_with(&base))
            .filter_map(|(key, _)| key[base.len()..].split('/').next())
            .map(str::to_string)
            .collect();

        if names.is_empty() && path != ROOT {
            if files.contains_key(&path) {
                return Err(not_a_directory(&path));
            }
            return Err(Error::not_found(&path));
        }
        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_and_remove() {
        let store = MemoryContentStore::new();
        store.write("/a", b"one").await.unwrap();
        assert_eq!(store.read("a").await.unwrap(), b"one");

        store.remove("/a").await.unwrap();
        assert!(store.is_empty().await);
        assert!(store.remove("/a").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_implied_directories() {
        let store = MemoryContentStore::new();
        store.write("/wiki/intro", b"").await.unwrap();
        store.write("/wiki/deep/page", b"").await.unwrap();
        store.write("/wikipedia", b"").await.unwrap();

        assert_eq!(store.list("/wiki").await.unwrap(), vec!["deep", "intro"]);
        assert_eq!(store.list("/").await.unwrap(), vec!["wiki", "wikipedia"]);
        assert!(matches!(
            store.list("/wikipedia").await.unwrap_err(),
            Error::InvalidInput(_)
        ));
        assert!(store.list("/nothing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_doc_and_children_coexist() {
        let store = MemoryContentStore::new();
        store.write("/wiki", b"index").await.unwrap();
        store.write("/wiki/intro", b"intro").await.unwrap();

        assert_eq!(store.read("/wiki").await.unwrap(), b"index");
        assert_eq!(store.list("/wiki").await.unwrap(), vec!["intro"]);
    }
}
