//! Document lifecycle against the on-disk backends.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docshelf::access::{Access, can_access};
use docshelf::content::DiskStore;
use docshelf::error::{Error, ErrorKind, Result};
use docshelf::index::{Indexer, SearchIndex};
use docshelf::service::{DocumentService, IndexMode, ServiceConfig};
use docshelf::store::{CollectionNames, MetadataStore, SqliteStore};
use docshelf::types::{Doc, Policy, User};
use tempfile::TempDir;

struct TestShelf {
    _temp_dir: TempDir,
    store: Arc<SqliteStore>,
    docs: DocumentService,
}

impl TestShelf {
    async fn new() -> Self {
        Self::with_index(None, ServiceConfig::default()).await
    }

    async fn with_index(index: Option<Arc<dyn Indexer>>, config: ServiceConfig) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::open(temp_dir.path().join("docshelf.db"), CollectionNames::default())
            .expect("open store");
        store.ensure_schema().await.expect("provision");
        let store = Arc::new(store);

        let index = match index {
            Some(index) => index,
            None => Arc::new(SearchIndex::open(temp_dir.path().join("index")).expect("open index")),
        };
        let docs = DocumentService::new(
            store.clone(),
            Arc::new(DiskStore::new(temp_dir.path())),
            index,
            config,
        );

        Self {
            _temp_dir: temp_dir,
            store,
            docs,
        }
    }
}

fn user(id: &str) -> User {
    let mut user = User::new(format!("{id}@example.com"), id);
    user.id = id.to_string();
    user
}

fn paths(docs: &[Doc]) -> Vec<&str> {
    docs.iter().map(|d| d.path.as_str()).collect()
}

/// Accepts nothing.
struct BrokenIndex;

#[async_trait]
impl Indexer for BrokenIndex {
    async fn index(&self, _path: &str, _text: &str) -> Result<()> {
        Err(Error::Timeout("index unavailable".to_string()))
    }

    async fn remove(&self, _path: &str) -> Result<()> {
        Err(Error::Timeout("index unavailable".to_string()))
    }

    async fn search(&self, _query: &str) -> Result<Vec<String>> {
        Err(Error::Timeout("index unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_put_then_get_returns_the_doc() {
    let shelf = TestShelf::new().await;
    let ada = user("ada");

    let doc = Doc::new("/wiki/intro", "Intro")
        .with_content("# Welcome")
        .with_tags(["public", "guide"]);
    shelf.docs.put_doc(doc.clone(), &ada).await.unwrap();

    let first = shelf.docs.get_doc("/wiki/intro", &ada).await.unwrap();
    assert_eq!(first.path, doc.path);
    assert_eq!(first.title, doc.title);
    assert_eq!(first.tags, doc.tags);
    assert_eq!(first.content, doc.content);
    assert!(first.policy.is_none());
    assert!(first.updated_at >= first.created_at);

    tokio::time::sleep(Duration::from_millis(5)).await;
    shelf
        .docs
        .put_doc(Doc::new("/wiki/intro", "Intro").with_content("# Welcome back"), &ada)
        .await
        .unwrap();

    let second = shelf.docs.get_doc("/wiki/intro", &ada).await.unwrap();
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at >= first.updated_at);
}

#[tokio::test]
async fn test_tag_filter_is_a_conjunction() {
    let shelf = TestShelf::new().await;
    let ada = user("ada");

    let fixtures: [(&str, &[&str]); 4] = [
        ("/wiki/a", &["x", "y"]),
        ("/wiki/b", &["x"]),
        ("/wiki/c", &[]),
        ("/other/d", &["x", "y"]),
    ];
    for (path, tags) in fixtures {
        shelf
            .docs
            .put_doc(Doc::new(path, "doc").with_tags(tags.iter().copied()), &ada)
            .await
            .unwrap();
    }

    let all = shelf.docs.list_docs("/wiki", &[], &ada).await.unwrap();
    assert_eq!(paths(&all), vec!["/wiki/a", "/wiki/b", "/wiki/c"]);

    for required in [vec!["x"], vec!["x", "y"], vec!["y", "z"]] {
        let required: Vec<String> = required.into_iter().map(String::from).collect();
        let filtered = shelf.docs.list_docs("/wiki", &required, &ada).await.unwrap();
        let expected: Vec<&Doc> = all.iter().filter(|d| d.has_tags(&required)).collect();
        assert_eq!(
            paths(&filtered),
            expected.iter().map(|d| d.path.as_str()).collect::<Vec<_>>(),
            "tags {required:?}"
        );
    }
}

#[tokio::test]
async fn test_tagging_twice_matches_tagging_once() {
    let shelf = TestShelf::new().await;
    let ada = user("ada");
    shelf.docs.put_doc(Doc::new("/notes", "Notes"), &ada).await.unwrap();

    let once = shelf.docs.tag_doc("/notes", ["todo"], &ada).await.unwrap();
    let twice = shelf.docs.tag_doc("/notes", ["todo"], &ada).await.unwrap();
    assert_eq!(once.tags, twice.tags);
}

#[test]
fn test_read_only_policy_evaluation() {
    let doc = Doc::new("/doc", "Doc").with_policy(Policy::new().with_users(["u1"]).read_only(true));
    assert!(can_access(&user("u1"), &doc, Access::Read));
    assert!(!can_access(&user("u1"), &doc, Access::Write));
    assert!(!can_access(&user("u2"), &doc, Access::Read));
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let shelf = TestShelf::new().await;

    shelf.store.put_user(User::new("a@x.com", "A")).await.unwrap();
    let err = shelf
        .store
        .put_user(User::new("a@x.com", "Other A"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_ensure_schema_twice_keeps_data() {
    let shelf = TestShelf::new().await;
    let ada = user("ada");
    shelf.docs.put_doc(Doc::new("/kept", "Kept"), &ada).await.unwrap();

    shelf.store.ensure_schema().await.unwrap();
    shelf.store.ensure_schema().await.unwrap();

    assert!(shelf.docs.get_doc("/kept", &ada).await.is_ok());
}

#[tokio::test]
async fn test_wiki_intro_scenario() {
    let shelf = TestShelf::new().await;
    let author = user("author");
    let reader = user("reader");

    shelf
        .docs
        .put_doc(Doc::new("/wiki/intro", "Intro").with_tags(["public", "guide"]), &author)
        .await
        .unwrap();

    assert!(shelf.docs.get_doc("/wiki/intro", &reader).await.is_ok());

    let guide = shelf
        .docs
        .list_docs("/wiki", &["guide".to_string()], &reader)
        .await
        .unwrap();
    assert_eq!(paths(&guide), vec!["/wiki/intro"]);

    let private = shelf
        .docs
        .list_docs("/wiki", &["guide".to_string(), "private".to_string()], &reader)
        .await
        .unwrap();
    assert!(private.is_empty());

    shelf.docs.remove_doc("/wiki/intro", &author).await.unwrap();
    let err = shelf.docs.get_doc("/wiki/intro", &reader).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_index_failure_is_partial_when_synchronous() {
    let shelf = TestShelf::with_index(Some(Arc::new(BrokenIndex)), ServiceConfig::default()).await;
    let ada = user("ada");

    let err = shelf
        .docs
        .put_doc(Doc::new("/a", "A").with_content("text"), &ada)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PartialFailure);

    // Content and metadata were kept.
    let doc = shelf.docs.get_doc("/a", &ada).await.unwrap();
    assert_eq!(doc.content.as_deref(), Some(b"text".as_slice()));
}

#[tokio::test]
async fn test_index_failure_is_logged_in_background_mode() {
    let config = ServiceConfig {
        index_mode: IndexMode::Background,
        ..ServiceConfig::default()
    };
    let shelf = TestShelf::with_index(Some(Arc::new(BrokenIndex)), config).await;
    let ada = user("ada");

    let path = shelf
        .docs
        .put_doc(Doc::new("a", "A").with_content("text"), &ada)
        .await
        .unwrap();
    assert_eq!(path, "/a");
}

#[tokio::test]
async fn test_tag_index_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("docshelf.db");
    let ada = user("ada");

    {
        let store = SqliteStore::open(&db_path, CollectionNames::default()).unwrap();
        store.ensure_schema().await.unwrap();
        store
            .put_doc(Doc::new("/tagged", "T").with_tags(["keep"]))
            .await
            .unwrap();
    }

    let shelf_store = Arc::new(SqliteStore::open(&db_path, CollectionNames::default()).unwrap());
    shelf_store.ensure_schema().await.unwrap();
    let docs = DocumentService::new(
        shelf_store,
        Arc::new(DiskStore::new(temp_dir.path())),
        Arc::new(SearchIndex::in_memory().unwrap()),
        ServiceConfig::default(),
    );

    let hits = docs.list_docs("/", &["keep".to_string()], &ada).await.unwrap();
    assert_eq!(paths(&hits), vec!["/tagged"]);
}

#[tokio::test]
async fn test_nested_docs_under_a_file_doc() {
    let shelf = TestShelf::new().await;
    let ada = user("ada");

    shelf
        .docs
        .put_doc(Doc::new("/wiki", "Wiki").with_content("index"), &ada)
        .await
        .unwrap();
    shelf.docs.put_doc(Doc::new("/wiki/intro", "Intro"), &ada).await.unwrap();
    shelf.docs.put_doc(Doc::new("/guide/setup", "Setup"), &ada).await.unwrap();
    shelf.docs.put_doc(Doc::new("/guide", "Guide"), &ada).await.unwrap();

    let wiki = shelf.docs.get_doc("/wiki", &ada).await.unwrap();
    assert_eq!(wiki.content.as_deref(), Some(b"index".as_slice()));
    let listed = shelf.docs.list_docs("/", &[], &ada).await.unwrap();
    assert_eq!(paths(&listed), vec!["/guide", "/guide/setup", "/wiki", "/wiki/intro"]);
}
