use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The four logical collections owned by a metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Groups,
    Docs,
    Policies,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Users,
        Collection::Groups,
        Collection::Docs,
        Collection::Policies,
    ];
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collection::Users => "users",
            Collection::Groups => "groups",
            Collection::Docs => "docs",
            Collection::Policies => "policies",
        };
        f.write_str(name)
    }
}

/// Backing table name for each collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    pub users: String,
    pub groups: String,
    pub docs: String,
    pub policies: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            users: "ds_user".to_string(),
            groups: "ds_group".to_string(),
            docs: "ds_doc".to_string(),
            policies: "ds_policy".to_string(),
        }
    }
}

impl CollectionNames {
    #[must_use]
    pub fn table(&self, collection: Collection) -> &str {
        match collection {
            Collection::Users => &self.users,
            Collection::Groups => &self.groups,
            Collection::Docs => &self.docs,
            Collection::Policies => &self.policies,
        }
    }

    /// Table names are interpolated into SQL, so only plain identifiers pass.
    pub fn validate(&self) -> Result<()> {
        let mut seen = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            let name = self.table(collection);
            let mut chars = name.chars();
            let valid_start = chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
            if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(Error::Config(format!(
                    "invalid table name for {collection}: '{name}'"
                )));
            }
            if seen.contains(&name) {
                return Err(Error::Config(format!("duplicate table name '{name}'")));
            }
            seen.push(name);
        }
        Ok(())
    }

    /// Statements creating the backing table of `collection`. The first
    /// statement creates the table itself; the rest create its indexes.
    #[must_use]
    pub fn ddl(&self, collection: Collection) -> Vec<String> {
        let table = self.table(collection);
        match collection {
            Collection::Users => vec![
                format!(
                    "CREATE TABLE {table} (
                        id TEXT PRIMARY KEY,
                        email TEXT NOT NULL,
                        name TEXT NOT NULL DEFAULT '',
                        token TEXT NOT NULL DEFAULT '',
                        group_ids TEXT NOT NULL DEFAULT '[]',  -- JSON array
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL,
                        deleted_at TEXT                     -- NULL = active
                    )"
                ),
                format!("CREATE UNIQUE INDEX IF NOT EXISTS {table}_email_idx ON {table}(email)"),
            ],
            Collection::Groups => vec![format!(
                "CREATE TABLE {table} (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    user_ids TEXT NOT NULL DEFAULT '[]',   -- JSON array
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )"
            )],
            // No foreign key to policies: collections are provisioned independently.
            Collection::Docs => vec![
                format!(
                    "CREATE TABLE {table} (
                        path TEXT PRIMARY KEY,
                        title TEXT NOT NULL,
                        is_dir INTEGER NOT NULL DEFAULT 0,
                        policy_id TEXT,
                        tags TEXT NOT NULL DEFAULT '[]',    -- JSON array of tags
                        created_by TEXT NOT NULL DEFAULT '',
                        updated_by TEXT NOT NULL DEFAULT '',
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL
                    )"
                ),
                format!("CREATE INDEX IF NOT EXISTS {table}_policy_idx ON {table}(policy_id)"),
            ],
            Collection::Policies => vec![format!(
                "CREATE TABLE {table} (
                    id TEXT PRIMARY KEY,
                    user_ids TEXT NOT NULL DEFAULT '[]',
                    group_ids TEXT NOT NULL DEFAULT '[]',
                    read_only INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )"
            )],
        }
    }
}
