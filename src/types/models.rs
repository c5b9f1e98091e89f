use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    /// Argon2 hash of the user's credential.
    #[serde(skip_serializing, default)]
    pub token: String,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    #[must_use]
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            email: email.into(),
            name: name.into(),
            token: String::new(),
            groups: BTreeSet::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Member user ids. Ids that no longer resolve are tolerated.
    #[serde(default)]
    pub users: BTreeSet<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Group {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: name.into(),
            users: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Users and groups that may access a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub users: BTreeSet<String>,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Policy {
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            users: BTreeSet::new(),
            groups: BTreeSet::new(),
            read_only: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stand-in for a policy id whose record has gone missing. Grants nobody.
    #[must_use]
    pub(crate) fn deny_all(id: String) -> Self {
        Self {
            id,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users.extend(users.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new()
    }
}

/// A document. The metadata record never carries `content`; it is filled in
/// only when a document is fetched through the document service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doc {
    pub path: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::content_base64"
    )]
    pub content: Option<Vec<u8>>,
    #[serde(default)]
    pub policy: Option<Policy>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub updated_by: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Doc {
    #[must_use]
    pub fn new(path: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            path: path.into(),
            title: title.into(),
            is_dir: false,
            content: None,
            policy: None,
            tags: BTreeSet::new(),
            created_by: String::new(),
            updated_by: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(content.into());
        self
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
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use]
    pub fn directory(mut self) -> Self {
        self.is_dir = true;
        self
    }

    /// Content as text, replacing invalid UTF-8.
    #[must_use]
    pub fn content_text(&self) -> String {
        self.content
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_tags(&self, required: &[String]) -> bool {
        required.iter().all(|tag| self.tags.contains(tag))
    }
}
