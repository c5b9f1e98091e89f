use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::directory::error::LockError;
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, Query, QueryParser};
use tantivy::schema::{Field, STORED, STRING, Schema, TEXT};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyError, Term, doc};

use super::Indexer;
use crate::error::{Error, Result};

const WRITER_HEAP_BYTES: usize = 15_000_000;

/// Tantivy-backed [`Indexer`].
///
/// A single writer is shared behind a lock. Every change is committed before
/// the call returns and the reader is reloaded, so searches see it at once.
#[derive(Clone)]
pub struct SearchIndex {
    inner: Arc<Inner>,
}

struct Inner {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    path: Field,
    content: Field,
}

fn schema() -> (Schema, Field, Field) {
    let mut schema_builder = Schema::builder();
    let path = schema_builder.add_text_field("path", STRING | STORED);
    let content = schema_builder.add_text_field("content", TEXT);
    (schema_builder.build(), path, content)
}

impl SearchIndex {
    /// Opens the index stored in `dir`, creating it if needed.
    ///
    /// Only one process may hold an index open. A second attempt fails with
    /// `Conflict`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let (schema, path, content) = schema();
        let directory = MmapDirectory::open(dir).map_err(TantivyError::from)?;
        let index = Index::open_or_create(directory, schema)?;
        Self::build(index, path, content).map_err(|e| match e {
            Error::Index(TantivyError::LockFailure(LockError::LockBusy, _)) => Error::Conflict(
                format!(
                    "search index at {} is in use by another process (is the server running?)",
                    dir.display()
                ),
            ),
            other => other,
        })
    }

    pub fn in_memory() -> Result<Self> {
        let (schema, path, content) = schema();
        Self::build(Index::create_in_ram(schema), path, content)
    }

    fn build(index: Index, path: Field, content: Field) -> Result<Self> {
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
        Ok(Self {
            inner: Arc::new(Inner {
                index,
                reader,
                writer: Mutex::new(writer),
                path,
                content,
            }),
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner)).await?
    }
}

impl Inner {
    fn writer(&self) -> std::sync::MutexGuard<'_, IndexWriter> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn index(&self, path: &str, text: &str) -> Result<()> {
        let mut writer = self.writer();
        writer.delete_term(Term::from_field_text(self.path, path));
        writer.add_document(doc!(
            self.path => path,
            self.content => text,
        ))?;
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<()> {
        let mut writer = self.writer();
        writer.delete_term(Term::from_field_text(self.path, path));
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    fn search(&self, query: &str) -> Result<Vec<String>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let parser = QueryParser::for_index(&self.index, vec![self.content]);
        let parsed = parser
            .parse_query(query)
            .map_err(|e| Error::InvalidInput(format!("invalid search query: {e}")))?;

        // Bare words also match near misses.
        let query: Box<dyn Query> = if query.chars().all(char::is_alphanumeric) {
            let term = Term::from_field_text(self.content, &query.to_lowercase());
            Box::new(BooleanQuery::new(vec![
                (Occur::Should, parsed),
                (Occur::Should, Box::new(FuzzyTermQuery::new(term, 1, true))),
            ]))
        } else {
            parsed
        };

        // Every hit is returned; callers filter by tags and policy afterwards.
        let searcher = self.reader.searcher();
        let limit = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX).max(1);
        let hits = searcher.search(query.as_ref(), &TopDocs::with_limit(limit))?;

        let mut paths = Vec::with_capacity(hits.len());
        for (_score, address) in hits {
            let retrieved = searcher.doc(address)?;
            if let Some(path) = retrieved.get_first(self.path).and_then(|v| v.as_text()) {
                paths.push(path.to_string());
            }
        }
        Ok(paths)
    }
}

#[async_trait]
impl Indexer for SearchIndex {
    async fn index(&self, path: &str, text: &str) -> Result<()> {
        let path = path.to_string();
        let text = text.to_string();
        self.blocking(move |inner| inner.index(&path, &text)).await
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.blocking(move |inner| inner.remove(&path)).await
    }

    async fn search(&self, query: &str) -> Result<Vec<String>> {
        let query = query.to_string();
        self.blocking(move |inner| inner.search(&query)).await
    }
}
