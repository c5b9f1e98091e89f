use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{ContentStore, not_a_directory};
use crate::error::{Error, Result};
use crate::store::path::{ROOT, normalize_path, normalize_prefix};

fn from_io(e: std::io::Error, path: &str) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::not_found(path)
    } else {
        Error::Io(e)
    }
}

/// Suffix of every content file. Directories never carry it, so a doc and
/// the docs beneath it can both be stored.
const CONTENT_SUFFIX: &str = ".md";

/// Document content stored as plain files under a root directory. The doc
/// `/wiki/intro` lives at `wiki/intro.md`, and `/wiki` at `wiki.md` beside it.
///
/// Writes go to a scratch file first and are renamed into place, so readers
/// never observe a partially written document.
pub struct DiskStore {
    base_path: PathBuf,
    temp_path: PathBuf,
}

impl DiskStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            base_path: data_dir.join("content"),
            temp_path: data_dir.join("tmp"),
        }
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn dir_path(&self, segments: &[&str], path: &str) -> Result<PathBuf> {
        let mut dir = self.base_path.clone();
        for segment in segments {
            if segment.ends_with(CONTENT_SUFFIX) {
                return Err(Error::InvalidInput(format!(
                    "{path}: directory names cannot end with '{CONTENT_SUFFIX}'"
                )));
            }
            dir.push(segment);
        }
        Ok(dir)
    }

    fn file_path(&self, path: &str) -> Result<(String, PathBuf)> {
        let normalized = normalize_path(path)?;
        let segments: Vec<&str> = normalized.trim_start_matches('/').split('/').collect();
        let Some((name, parents)) = segments.split_last() else {
            return Err(Error::InvalidInput("path cannot be empty".to_string()));
        };
        let file = self
            .dir_path(parents, &normalized)?
            .join(format!("{name}{CONTENT_SUFFIX}"));
        Ok((normalized, file))
    }
}

#[async_trait]
impl ContentStore for DiskStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let (path, file) = self.file_path(path)?;
        fs::read(&file).await.map_err(|e| from_io(e, &path))
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let (_, final_path) = self.file_path(path)?;

        fs::create_dir_all(&self.temp_path).await?;
        let temp_path = self.temp_path.join(Uuid::new_v4().to_string());

        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(content).await?;
        temp_file.sync_all().await?;
        drop(temp_file);

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let (path, file) = self.file_path(path)?;
        fs::remove_file(&file).await.map_err(|e| from_io(e, &path))
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        let path = normalize_prefix(path)?;
        let dir = if path == ROOT {
            self.base_path.clone()
        } else {
            let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
            self.dir_path(&segments, &path)?
        };

        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(not_a_directory(&path)),
            // Nothing written yet.
            Err(e) if e.kind() == ErrorKind::NotFound && path == ROOT => return Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let (_, file) = self.file_path(&path)?;
                if fs::try_exists(&file).await? {
                    return Err(not_a_directory(&path));
                }
                return Err(Error::not_found(&path));
            }
            Err(e) => return Err(e.into()),
        }

        let mut entries = fs::read_dir(&dir).await?;
        let mut names = BTreeSet::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                names.insert(name);
            } else if let Some(doc) = name.strip_suffix(CONTENT_SUFFIX) {
                names.insert(doc.to_string());
            }
        }
        Ok(names.into_iter().collect())
    }
}
