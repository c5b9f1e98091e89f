pub mod path;
mod provision;
mod schema;
mod sqlite;
mod tags;

pub use provision::{Provisioned, provision_all};
pub use schema::{Collection, CollectionNames};
pub use sqlite::SqliteStore;
pub use tags::TagIndex;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Doc, Group, Policy, User};

/// Filter for [`MetadataStore::list_docs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocQuery {
    /// Path prefix, matched on segment boundaries. Empty or `/` matches all.
    pub prefix: String,
    /// Every listed doc must carry all of these tags.
    pub tags: Vec<String>,
    /// Optional candidate restriction, e.g. from a full-text search.
    pub paths: Option<BTreeSet<String>>,
}

impl DocQuery {
    #[must_use]
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn within(mut self, paths: BTreeSet<String>) -> Self {
        self.paths = Some(paths);
        self
    }
}

/// Durable, keyed storage for users, groups, documents and policies.
///
/// `put_*` inserts or fully replaces a record. An empty key is replaced with a
/// generated one, `updated_at` is always re-stamped and `created_at` is only
/// stamped on first insert. Missing keys surface as `Error::NotFound`.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Creates any missing collections. Safe to call repeatedly and from
    /// several processes at once.
    async fn ensure_schema(&self) -> Result<()>;

    /// Rebuilds the tag index from the Docs collection.
    async fn rebuild_tag_index(&self) -> Result<()>;

    // User operations
    async fn get_user(&self, id: &str) -> Result<User>;
    async fn get_user_by_email(&self, email: &str) -> Result<User>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn put_user(&self, user: User) -> Result<String>;
    /// Soft delete: stamps `deleted_at` and keeps the record.
    async fn remove_user(&self, id: &str) -> Result<()>;

    // Group operations
    async fn get_group(&self, id: &str) -> Result<Group>;
    async fn list_groups(&self) -> Result<Vec<Group>>;
    async fn put_group(&self, group: Group) -> Result<String>;
    async fn remove_group(&self, id: &str) -> Result<()>;

    // Policy operations
    async fn get_policy(&self, id: &str) -> Result<Policy>;
    async fn put_policy(&self, policy: Policy) -> Result<String>;
    async fn remove_policy(&self, id: &str) -> Result<()>;

    // Doc operations. Content is never part of the record.
    async fn get_doc(&self, path: &str) -> Result<Doc>;
    /// Writes the doc record, upserting its policy if it carries one.
    async fn put_doc(&self, doc: Doc) -> Result<String>;
    /// Removes the record and returns it. Its policy is left in place.
    async fn remove_doc(&self, path: &str) -> Result<Doc>;
    async fn list_docs(&self, query: &DocQuery) -> Result<Vec<Doc>>;
}
