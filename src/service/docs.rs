use std::collections::BTreeSet;
use std::sync::Arc;

use super::{IndexMode, ServiceConfig, bounded};
use crate::access::{Access, can_access};
use crate::content::ContentStore;
use crate::error::{Error, Result};
use crate::index::Indexer;
use crate::store::path::{ROOT, file_name, normalize_path};
use crate::store::{DocQuery, MetadataStore};
use crate::types::{Doc, User};

/// How a list request selects documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    /// Documents at or beneath a path.
    Prefix(String),
    /// Documents whose content matches a full-text query.
    Search(String),
}

impl ListFilter {
    /// An empty filter or one starting with `/` is a path prefix; anything
    /// else is a search term.
    #[must_use]
    pub fn parse(filter: &str) -> Self {
        let filter = filter.trim();
        if filter.is_empty() {
            Self::Prefix(ROOT.to_string())
        } else if filter.starts_with('/') {
            Self::Prefix(filter.to_string())
        } else {
            Self::Search(filter.to_string())
        }
    }
}

/// Document lifecycle over a metadata store, a content store and an indexer.
///
/// Writes go content, then metadata, then index. Removals go metadata, then
/// content, then index. Neither sequence is atomic; a failure after an earlier
/// step succeeded is reported as `PartialFailure`.
pub struct DocumentService {
    store: Arc<dyn MetadataStore>,
    content: Arc<dyn ContentStore>,
    index: Arc<dyn Indexer>,
    config: ServiceConfig,
}

impl DocumentService {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        content: Arc<dyn ContentStore>,
        index: Arc<dyn Indexer>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            content,
            index,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub async fn put_doc(&self, mut doc: Doc, acting: &User) -> Result<String> {
        let path = normalize_path(&doc.path)?;
        doc.path = path.clone();
        if doc.title.is_empty() {
            doc.title = file_name(&path).to_string();
        }
        doc.title = doc.title.trim().to_string();
        if doc.title.is_empty() {
            return Err(Error::InvalidInput("title cannot be empty".to_string()));
        }
        doc.tags = clean_tags(std::mem::take(&mut doc.tags))?;

        let existing = match self.metadata(&path).await {
            Ok(existing) => {
                authorize(acting, &existing, Access::Write)?;
                Some(existing)
            }
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        match &existing {
            Some(existing) => doc.created_by = existing.created_by.clone(),
            None => doc.created_by = acting.id.clone(),
        }
        // A doc only ever writes its own policy record. Any other id is
        // replaced so another doc's policy cannot be overwritten through it.
        let previous_policy = existing
            .as_ref()
            .and_then(|existing| existing.policy.as_ref())
            .map(|policy| policy.id.clone());
        if let Some(policy) = &mut doc.policy {
            match &previous_policy {
                Some(previous) => policy.id.clone_from(previous),
                None => policy.id.clear(),
            }
        }
        doc.updated_by = acting.id.clone();

        // Metadata-only updates of an existing doc leave its bytes alone.
        let content = match doc.content.take() {
            Some(content) => Some(content),
            None if existing.is_none() => Some(Vec::new()),
            None => None,
        };
        let is_dir = doc.is_dir;
        let content = if is_dir { None } else { content };

        if let Some(bytes) = &content {
            bounded(self.config.op_timeout, "content write", self.content.write(&path, bytes))
                .await?;
        }

        if let Err(e) = bounded(self.config.op_timeout, "metadata write", self.store.put_doc(doc)).await {
            if content.is_some() {
                tracing::warn!(%path, "content written but metadata write failed, bytes are orphaned until the path is rewritten: {e}");
                return Err(Error::partial(path, "content write", "metadata write", e));
            }
            return Err(e);
        }

        if let Some(bytes) = content {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            self.index_content(&path, text).await?;
        }

        tracing::debug!(%path, user = %acting.id, "stored doc");
        Ok(path)
    }

    /// Fetches a doc with its content. A doc the caller may not read is
    /// reported as missing.
    pub async fn get_doc(&self, path: &str, acting: &User) -> Result<Doc> {
        let path = normalize_path(path)?;
        let mut doc = self.metadata(&path).await?;
        authorize(acting, &doc, Access::Read)?;

        if !doc.is_dir {
            let content =
                match bounded(self.config.op_timeout, "content read", self.content.read(&path)).await {
                    Ok(content) => content,
                    Err(e) if e.is_not_found() => {
                        tracing::warn!(%path, "doc has metadata but no stored content");
                        Vec::new()
                    }
                    Err(e) => return Err(e),
                };
            doc.content = Some(content);
        }
        Ok(doc)
    }

    /// Lists docs the caller may read, without content.
    pub async fn list_docs(&self, filter: &str, tags: &[String], acting: &User) -> Result<Vec<Doc>> {
        self.list(ListFilter::parse(filter), tags, acting).await
    }

    /// Full-text search over docs the caller may read.
    pub async fn search(&self, query: &str, acting: &User) -> Result<Vec<Doc>> {
        self.list(ListFilter::Search(query.trim().to_string()), &[], acting)
            .await
    }

    pub async fn list(&self, filter: ListFilter, tags: &[String], acting: &User) -> Result<Vec<Doc>> {
        let tags: Vec<String> = clean_tags(tags.iter().cloned())?.into_iter().collect();

        let query = match filter {
            ListFilter::Prefix(prefix) => DocQuery::prefix(prefix),
            ListFilter::Search(term) => {
                let hits = bounded(self.config.op_timeout, "search", self.index.search(&term)).await?;
                DocQuery::default().within(hits.into_iter().collect())
            }
        }
        .with_tags(tags);

        let docs = bounded(self.config.op_timeout, "metadata list", self.store.list_docs(&query)).await?;
        Ok(docs
            .into_iter()
            .filter(|doc| can_access(acting, doc, Access::Read))
            .collect())
    }

    /// Adds `tags` to the doc at `path`. Tags already present are left as is.
    pub async fn tag_doc<I, S>(&self, path: &str, tags: I, acting: &User) -> Result<Doc>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = clean_tags(tags.into_iter().map(Into::into))?;
        if tags.is_empty() {
            return Err(Error::InvalidInput("no tags given".to_string()));
        }

        let path = normalize_path(path)?;
        let mut doc = self.metadata(&path).await?;
        authorize(acting, &doc, Access::Read)?;

        if tags.is_subset(&doc.tags) {
            return Ok(doc);
        }
        doc.tags.extend(tags);
        doc.updated_by = acting.id.clone();
        bounded(self.config.op_timeout, "metadata write", self.store.put_doc(doc)).await?;
        self.metadata(&path).await
    }

    /// Pins the doc for the acting user with a per-user tag.
    pub async fn pin_doc(&self, path: &str, acting: &User) -> Result<Doc> {
        self.tag_doc(path, [pin_tag(acting)], acting).await
    }

    pub async fn remove_doc(&self, path: &str, acting: &User) -> Result<Doc> {
        let path = normalize_path(path)?;
        let existing = self.metadata(&path).await?;
        authorize(acting, &existing, Access::Write)?;

        let removed =
            bounded(self.config.op_timeout, "metadata removal", self.store.remove_doc(&path)).await?;

        if !removed.is_dir {
            match bounded(self.config.op_timeout, "content removal", self.content.remove(&path)).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    tracing::warn!(%path, "doc removed but its content could not be: {e}");
                    return Err(Error::partial(path, "metadata removal", "content removal", e));
                }
            }
            self.unindex(&path).await?;
        }

        tracing::debug!(%path, user = %acting.id, "removed doc");
        Ok(removed)
    }

    /// Removes the doc and the policy attached to it.
    pub async fn purge_doc(&self, path: &str, acting: &User) -> Result<Doc> {
        let removed = self.remove_doc(path, acting).await?;
        if let Some(policy) = &removed.policy {
            match bounded(self.config.op_timeout, "policy removal", self.store.remove_policy(&policy.id)).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    return Err(Error::partial(&removed.path, "doc removal", "policy removal", e));
                }
            }
        }
        Ok(removed)
    }

    /// Re-indexes the content of every doc. Returns how many were indexed.
    pub async fn reindex_all(&self) -> Result<usize> {
        let docs = self.store.list_docs(&DocQuery::default()).await?;
        let mut indexed = 0;
        for doc in docs.iter().filter(|doc| !doc.is_dir) {
            let content = match self.content.read(&doc.path).await {
                Ok(content) => content,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            self.index
                .index(&doc.path, &String::from_utf8_lossy(&content))
                .await?;
            indexed += 1;
        }
        tracing::info!(indexed, "rebuilt search index");
        Ok(indexed)
    }

    async fn metadata(&self, path: &str) -> Result<Doc> {
        bounded(self.config.op_timeout, "metadata read", self.store.get_doc(path)).await
    }

    async fn index_content(&self, path: &str, text: String) -> Result<()> {
        match self.config.index_mode {
            IndexMode::Sync => bounded(self.config.op_timeout, "indexing", self.index.index(path, &text))
                .await
                .map_err(|e| Error::partial(path, "metadata write", "indexing", e)),
            IndexMode::Background => {
                let index = Arc::clone(&self.index);
                let path = path.to_string();
                tokio::spawn(async move {
                    if let Err(e) = index.index(&path, &text).await {
                        tracing::warn!(%path, "background indexing failed: {e}");
                    }
                });
                Ok(())
            }
        }
    }

    async fn unindex(&self, path: &str) -> Result<()> {
        match self.config.index_mode {
            IndexMode::Sync => bounded(self.config.op_timeout, "index removal", self.index.remove(path))
                .await
                .map_err(|e| Error::partial(path, "metadata removal", "index removal", e)),
            IndexMode::Background => {
                let index = Arc::clone(&self.index);
                let path = path.to_string();
                tokio::spawn(async move {
                    if let Err(e) = index.remove(&path).await {
                        tracing::warn!(%path, "background index removal failed: {e}");
                    }
                });
                Ok(())
            }
        }
    }
}

/// Tag applied by [`DocumentService::pin_doc`].
#[must_use]
pub fn pin_tag(user: &User) -> String {
    format!("user/{}", user.id)
}

/// Unreadable docs look missing. Readable docs the caller may not change are
/// forbidden.
fn authorize(user: &User, doc: &Doc, access: Access) -> Result<()> {
    if can_access(user, doc, access) {
        return Ok(());
    }
    if access == Access::Write && can_access(user, doc, Access::Read) {
        return Err(Error::Forbidden);
    }
    Err(Error::not_found(&doc.path))
}

fn clean_tags<I>(tags: I) -> Result<BTreeSet<String>>
where
    I: IntoIterator<Item = String>,
{
    tags.into_iter()
        .map(|tag| {
            let tag = tag.trim();
            if tag.is_empty() {
                Err(Error::InvalidInput("tags cannot be empty".to_string()))
            } else {
                Ok(tag.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryContentStore;
    use crate::error::ErrorKind;
    use crate::index::SearchIndex;
    use crate::store::{CollectionNames, SqliteStore};
    use crate::types::Policy;

    async fn service() -> DocumentService {
        let store = SqliteStore::open_in_memory(CollectionNames::default()).unwrap();
        store.ensure_schema().await.unwrap();
        DocumentService::new(
            Arc::new(store),
            Arc::new(MemoryContentStore::new()),
            Arc::new(SearchIndex::in_memory().unwrap()),
            ServiceConfig::default(),
        )
    }

    fn user(id: &str) -> User {
        let mut user = User::new(format!("{id}@example.com"), id);
        user.id = id.to_string();
        user
    }

    #[test]
    fn test_list_filter_parse() {
        assert_eq!(ListFilter::parse(""), ListFilter::Prefix("/".to_string()));
        assert_eq!(ListFilter::parse("/wiki"), ListFilter::Prefix("/wiki".to_string()));
        assert_eq!(ListFilter::parse("rust"), ListFilter::Search("rust".to_string()));
    }

    #[tokio::test]
    async fn test_put_stamps_authors() {
        let service = service().await;
        let ada = user("ada");
        let bob = user("bob");

        service
            .put_doc(Doc::new("/a", "A").with_content("one"), &ada)
            .await
            .unwrap();
        service
            .put_doc(Doc::new("/a", "A").with_content("two"), &bob)
            .await
            .unwrap();

        let doc = service.get_doc("/a", &ada).await.unwrap();
        assert_eq!(doc.created_by, "ada");
        assert_eq!(doc.updated_by, "bob");
        assert_eq!(doc.content.as_deref(), Some(b"two".as_slice()));
    }

    #[tokio::test]
    async fn test_put_defaults_title_and_rejects_blank() {
        let service = service().await;
        let ada = user("ada");

        service.put_doc(Doc::new("/wiki/intro", ""), &ada).await.unwrap();
        assert_eq!(service.get_doc("/wiki/intro", &ada).await.unwrap().title, "intro");

        let err = service
            .put_doc(Doc::new("/wiki/blank", "   "), &ada)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_metadata_update_keeps_content() {
        let service = service().await;
        let ada = user("ada");

        service
            .put_doc(Doc::new("/a", "A").with_content("body"), &ada)
            .await
            .unwrap();
        service.put_doc(Doc::new("/a", "Renamed"), &ada).await.unwrap();

        let doc = service.get_doc("/a", &ada).await.unwrap();
        assert_eq!(doc.title, "Renamed");
        assert_eq!(doc.content_text(), "body");
    }

    #[tokio::test]
    async fn test_unreadable_doc_is_not_found() {
        let service = service().await;
        let owner = user("owner");
        let stranger = user("stranger");

        let private = Doc::new("/private", "P").with_policy(Policy::new().with_users(["owner"]));
        service.put_doc(private, &owner).await.unwrap();

        let err = service.get_doc("/private", &stranger).await.unwrap_err();
        assert!(err.is_not_found());
        let err = service.remove_doc("/private", &stranger).await.unwrap_err();
        assert!(err.is_not_found());
        let err = service
            .put_doc(Doc::new("/private", "mine now"), &stranger)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_only_doc_is_forbidden_to_change() {
        let service = service().await;
        let owner = user("owner");

        let locked = Doc::new("/locked", "L")
            .with_policy(Policy::new().with_users(["owner"]).read_only(true));
        service.put_doc(locked, &owner).await.unwrap();

        service.get_doc("/locked", &owner).await.unwrap();
        let err = service.remove_doc("/locked", &owner).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[tokio::test]
    async fn test_tag_doc_is_idempotent() {
        let service = service().await;
        let ada = user("ada");
        service.put_doc(Doc::new("/a", "A"), &ada).await.unwrap();

        let once = service.tag_doc("/a", ["x"], &ada).await.unwrap();
        let twice = service.tag_doc("/a", ["x", " x "], &ada).await.unwrap();
        assert_eq!(once.tags, twice.tags);
        assert_eq!(twice.tags, BTreeSet::from(["x".to_string()]));

        let err = service.tag_doc("/a", [""], &ada).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_pin_doc() {
        let service = service().await;
        let ada = user("ada");
        service.put_doc(Doc::new("/a", "A"), &ada).await.unwrap();
        service.pin_doc("/a", &ada).await.unwrap();

        let pinned = service
            .list_docs("", &[pin_tag(&ada)], &ada)
            .await
            .unwrap();
        assert_eq!(pinned.len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_policy_filtered() {
        let service = service().await;
        let owner = user("owner");
        let stranger = user("stranger");

        service.put_doc(Doc::new("/open", "O"), &owner).await.unwrap();
        service
            .put_doc(
                Doc::new("/closed", "C").with_policy(Policy::new().with_users(["owner"])),
                &owner,
            )
            .await
            .unwrap();

        assert_eq!(service.list_docs("/", &[], &owner).await.unwrap().len(), 2);
        let visible = service.list_docs("/", &[], &stranger).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].path, "/open");
        assert!(visible[0].content.is_none());
    }

    #[tokio::test]
    async fn test_search_intersects_tags() {
        let service = service().await;
        let ada = user("ada");

        service
            .put_doc(Doc::new("/a", "A").with_content("rust ownership").with_tags(["lang"]), &ada)
            .await
            .unwrap();
        service
            .put_doc(Doc::new("/b", "B").with_content("rust borrowing"), &ada)
            .await
            .unwrap();

        let hits = service.search("rust", &ada).await.unwrap();
        assert_eq!(hits.len(), 2);

        let tagged = service
            .list_docs("rust", &["lang".to_string()], &ada)
            .await
            .unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].path, "/a");
    }

    #[tokio::test]
    async fn test_remove_clears_search_hits() {
        let service = service().await;
        let ada = user("ada");

        service
            .put_doc(Doc::new("/a", "A").with_content("ephemeral"), &ada)
            .await
            .unwrap();
        service.remove_doc("/a", &ada).await.unwrap();

        assert!(service.search("ephemeral", &ada).await.unwrap().is_empty());
        assert!(service.get_doc("/a", &ada).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_tag_doc_stamps_updated_by() {
        let service = service().await;
        service.put_doc(Doc::new("/a", "A"), &user("ada")).await.unwrap();

        let tagged = service.tag_doc("/a", ["x"], &user("bob")).await.unwrap();
        assert_eq!(tagged.created_by, "ada");
        assert_eq!(tagged.updated_by, "bob");
    }

    #[tokio::test]
    async fn test_policy_id_of_another_doc_is_not_reused() {
        let service = service().await;
        let owner = user("owner");
        let mallory = user("mallory");

        service
            .put_doc(
                Doc::new("/secret", "S")
                    .with_policy(Policy::new().with_users(["owner", "mallory"]).read_only(true)),
                &owner,
            )
            .await
            .unwrap();
        let secret_policy = service
            .get_doc("/secret", &mallory)
            .await
            .unwrap()
            .policy
            .unwrap();

        let mut hijack = Policy::new().with_users(["mallory"]);
        hijack.id = secret_policy.id.clone();
        service
            .put_doc(Doc::new("/mine", "M").with_policy(hijack), &mallory)
            .await
            .unwrap();

        let mine = service.get_doc("/mine", &mallory).await.unwrap();
        assert_ne!(mine.policy.unwrap().id, secret_policy.id);

        let err = service.remove_doc("/secret", &mallory).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let secret = service.get_doc("/secret", &owner).await.unwrap();
        assert_eq!(secret.policy.unwrap(), secret_policy);
    }

    #[tokio::test]
    async fn test_update_keeps_own_policy_id() {
        let service = service().await;
        let ada = user("ada");

        service
            .put_doc(Doc::new("/p", "P").with_policy(Policy::new().with_users(["ada"])), &ada)
            .await
            .unwrap();
        let first = service.get_doc("/p", &ada).await.unwrap().policy.unwrap();

        let mut replacement = Policy::new().with_users(["ada", "bob"]);
        replacement.id = "made-up".to_string();
        service
            .put_doc(Doc::new("/p", "P").with_policy(replacement), &ada)
            .await
            .unwrap();

        let second = service.get_doc("/p", &ada).await.unwrap().policy.unwrap();
        assert_eq!(second.id, first.id);
        assert!(second.users.contains("bob"));
    }

    #[tokio::test]
    async fn test_purge_removes_policy() {
        let store = Arc::new(SqliteStore::open_in_memory(CollectionNames::default()).unwrap());
        store.ensure_schema().await.unwrap();
        let service = DocumentService::new(
            store.clone(),
            Arc::new(MemoryContentStore::new()),
            Arc::new(SearchIndex::in_memory().unwrap()),
            ServiceConfig::default(),
        );
        let ada = user("ada");

        service
            .put_doc(
                Doc::new("/p", "P").with_policy(Policy::new().with_users(["ada"])),
                &ada,
            )
            .await
            .unwrap();
        let removed = service.purge_doc("/p", &ada).await.unwrap();
        let policy_id = removed.policy.unwrap().id;

        assert!(store.get_policy(&policy_id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_directories_skip_content() {
        let service = service().await;
        let ada = user("ada");

        service
            .put_doc(Doc::new("/wiki", "Wiki").directory(), &ada)
            .await
            .unwrap();
        let dir = service.get_doc("/wiki", &ada).await.unwrap();
        assert!(dir.is_dir);
        assert!(dir.content.is_none());
        service.remove_doc("/wiki", &ada).await.unwrap();
    }

    #[tokio::test]
    async fn test_reindex_all() {
        let content = Arc::new(MemoryContentStore::new());
        let store = SqliteStore::open_in_memory(CollectionNames::default()).unwrap();
        store.ensure_schema().await.unwrap();
        let store: Arc<dyn MetadataStore> = Arc::new(store);
        let ada = user("ada");

        let first = DocumentService::new(
            store.clone(),
            content.clone(),
            Arc::new(SearchIndex::in_memory().unwrap()),
            ServiceConfig::default(),
        );
        first
            .put_doc(Doc::new("/a", "A").with_content("recoverable"), &ada)
            .await
            .unwrap();

        // A fresh, empty index over the same data.
        let second = DocumentService::new(
            store,
            content,
            Arc::new(SearchIndex::in_memory().unwrap()),
            ServiceConfig::default(),
        );
        assert!(second.search("recoverable", &ada).await.unwrap().is_empty());
        assert_eq!(second.reindex_all().await.unwrap(), 1);
        assert_eq!(second.search("recoverable", &ada).await.unwrap().len(), 1);
    }
}
