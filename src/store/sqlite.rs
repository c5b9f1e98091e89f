use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use uuid::Uuid;

use super::path::{ROOT, is_within, normalize_prefix};
use super::provision::{Provisioned, provision_all};
use super::schema::{Collection, CollectionNames};
use super::tags::TagIndex;
use super::{DocQuery, MetadataStore};
use crate::error::{Error, Result};
use crate::types::{Doc, Group, Policy, User};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of bound paths per batched doc fetch.
const FETCH_CHUNK: usize = 500;

const USER_COLUMNS: &str = "id, email, name, token, group_ids, created_at, updated_at, deleted_at";
const GROUP_COLUMNS: &str = "id, name, user_ids, created_at, updated_at";
const POLICY_COLUMNS: &str = "id, user_ids, group_ids, read_only, created_at, updated_at";
const DOC_COLUMNS: &str =
    "path, title, is_dir, policy_id, tags, created_by, updated_by, created_at, updated_at";

/// SQLite-backed [`MetadataStore`].
///
/// All statements run on the blocking pool behind a single connection. The tag
/// index is updated while that connection is still held, so it observes writes
/// in commit order. Commits made through other connections to the same file
/// are detected with `PRAGMA data_version` and trigger a rebuild before the
/// index is consulted.
#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<Inner>,
}

struct Inner {
    conn: Mutex<Connection>,
    names: CollectionNames,
    tags: TagIndex,
    /// `data_version` the tag index was last built against.
    tags_version: AtomicI64,
}

const UNSYNCED: i64 = i64::MIN;

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(db_path: P, names: CollectionNames) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn, names)
    }

    pub fn open_in_memory(names: CollectionNames) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, names)
    }

    /// Wraps an already opened connection. Collections are not provisioned
    /// until [`MetadataStore::ensure_schema`] is called.
    pub fn from_connection(conn: Connection, names: CollectionNames) -> Result<Self> {
        names.validate()?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(conn),
                names,
                tags: TagIndex::new(),
                tags_version: AtomicI64::new(UNSYNCED),
            }),
        })
    }

    #[must_use]
    pub fn names(&self) -> &CollectionNames {
        &self.inner.names
    }

    #[must_use]
    pub fn tag_index(&self) -> &TagIndex {
        &self.inner.tags
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

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn data_version(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("PRAGMA data_version", [], |row| row.get(0))?)
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn json_set(row: &Row<'_>, idx: usize) -> rusqlite::Result<BTreeSet<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        token: row.get(3)?,
        groups: json_set(row, 4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
        deleted_at: row
            .get::<_, Option<String>>(7)?
            .as_deref()
            .map(parse_datetime),
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        users: json_set(row, 2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn policy_from_row(row: &Row<'_>) -> rusqlite::Result<Policy> {
    Ok(Policy {
        id: row.get(0)?,
        users: json_set(row, 1)?,
        groups: json_set(row, 2)?,
        read_only: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

/// A doc row with its policy still unresolved.
fn doc_from_row(row: &Row<'_>) -> rusqlite::Result<(Doc, Option<String>)> {
    let doc = Doc {
        path: row.get(0)?,
        title: row.get(1)?,
        is_dir: row.get(2)?,
        content: None,
        policy: None,
        tags: json_set(row, 4)?,
        created_by: row.get(5)?,
        updated_by: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    };
    Ok((doc, row.get(3)?))
}

fn constraint_conflict(err: rusqlite::Error, what: impl FnOnce() -> String) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            Error::Conflict(what())
        }
        other => Error::from(other),
    }
}

/// Timestamps for a write to `key`: `created_at` is kept from the stored row
/// and `updated_at` never moves backwards.
fn stamps(conn: &Connection, table: &str, key_column: &str, key: &str) -> Result<(String, String)> {
    let now = Utc::now();
    let stored: Option<(String, String)> = conn
        .query_row(
            &format!("SELECT created_at, updated_at FROM {table} WHERE {key_column} = ?1"),
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    Ok(match stored {
        Some((created_at, updated_at)) => {
            let updated_at = parse_datetime(&updated_at).max(now);
            (created_at, format_datetime(&updated_at))
        }
        None => (format_datetime(&now), format_datetime(&now)),
    })
}

fn get_policy(conn: &Connection, table: &str, id: &str) -> Result<Policy> {
    conn.query_row(
        &format!("SELECT {POLICY_COLUMNS} FROM {table} WHERE id = ?1"),
        params![id],
        policy_from_row,
    )
    .optional()?
    .ok_or_else(|| Error::not_found(format!("policy {id}")))
}

fn upsert_policy(conn: &Connection, table: &str, mut policy: Policy) -> Result<String> {
    if policy.id.is_empty() {
        policy.id = Uuid::new_v4().to_string();
    }
    let (created_at, updated_at) = stamps(conn, table, "id", &policy.id)?;

    conn.execute(
        &format!(
            "INSERT INTO {table} ({POLICY_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                user_ids = excluded.user_ids,
                group_ids = excluded.group_ids,
                read_only = excluded.read_only,
                updated_at = excluded.updated_at"
        ),
        params![
            policy.id,
            serde_json::to_string(&policy.users)?,
            serde_json::to_string(&policy.groups)?,
            policy.read_only,
            created_at,
            updated_at,
        ],
    )?;
    Ok(policy.id)
}

/// Resolves a doc's policy reference. A reference whose record has gone
/// missing resolves to a policy that grants nobody.
fn hydrate_policy(
    conn: &Connection,
    table: &str,
    policy_id: Option<String>,
    cache: &mut HashMap<String, Policy>,
) -> Result<Option<Policy>> {
    let Some(id) = policy_id else {
        return Ok(None);
    };
    if let Some(policy) = cache.get(&id) {
        return Ok(Some(policy.clone()));
    }

    let policy = match get_policy(conn, table, &id) {
        Ok(policy) => policy,
        Err(e) if e.is_not_found() => {
            tracing::debug!(policy = %id, "doc references a missing policy, denying access");
            Policy::deny_all(id.clone())
        }
        Err(e) => return Err(e),
    };
    cache.insert(id, policy.clone());
    Ok(Some(policy))
}

impl Inner {
    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn provision(&self, collection: Collection) -> Result<Provisioned> {
        let table = self.names.table(collection);
        let mut statements = self.names.ddl(collection).into_iter();
        let conn = self.conn();

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![table],
            |row| row.get(0),
        )?;

        let mut outcome = Provisioned::Existing;
        let create = statements.next();
        if !exists {
            if let Some(create) = create {
                match conn.execute_batch(&create) {
                    Ok(()) => outcome = Provisioned::Created,
                    // Another process created it between our check and our create.
                    Err(rusqlite::Error::SqliteFailure(_, Some(msg)))
                        if msg.contains("already exists") => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        for statement in statements {
            conn.execute_batch(&statement)?;
        }

        if outcome == Provisioned::Created {
            tracing::info!(%collection, table, "created collection");
        }
        Ok(outcome)
    }

    fn rebuild_tag_index(&self) -> Result<()> {
        self.reload_tags(&self.conn())
    }

    fn reload_tags(&self, conn: &Connection) -> Result<()> {
        let table = &self.names.docs;
        let version = data_version(conn)?;
        let mut stmt = conn.prepare(&format!("SELECT path, tags FROM {table}"))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, json_set(row, 1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        self.tags
            .rebuild(rows.iter().map(|(path, tags)| (path.as_str(), tags)));
        self.tags_version.store(version, Ordering::Relaxed);
        tracing::debug!(docs = rows.len(), tags = self.tags.tag_count(), "rebuilt tag index");
        Ok(())
    }

    /// Rebuilds the tag index if another connection has committed since it
    /// was last built. Commits on this connection keep it current already.
    fn refresh_tags(&self, conn: &Connection) -> Result<()> {
        if data_version(conn)? != self.tags_version.load(Ordering::Relaxed) {
            tracing::debug!("database changed by another connection");
            self.reload_tags(conn)?;
        }
        Ok(())
    }

    // User operations

    fn get_user(&self, id: &str) -> Result<User> {
        let table = &self.names.users;
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM {table} WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found(format!("user {id}")))
    }

    fn get_user_by_email(&self, email: &str) -> Result<User> {
        let table = &self.names.users;
        self.conn()
            .query_row(
                &format!(
                    "SELECT {USER_COLUMNS} FROM {table} WHERE email = ?1 AND deleted_at IS NULL"
                ),
                params![email],
                user_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found(format!("user {email}")))
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let table = &self.names.users;
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM {table} WHERE deleted_at IS NULL ORDER BY email"
        ))?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn put_user(&self, mut user: User) -> Result<String> {
        let table = &self.names.users;
        if user.id.is_empty() {
            user.id = Uuid::new_v4().to_string();
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let owner: Option<String> = tx
            .query_row(
                &format!("SELECT id FROM {table} WHERE email = ?1"),
                params![user.email],
                |row| row.get(0),
            )
            .optional()?;
        if owner.is_some_and(|owner| owner != user.id) {
            return Err(Error::Conflict(format!("email {} is already in use", user.email)));
        }

        let (created_at, updated_at) = stamps(&tx, table, "id", &user.id)?;
        tx.execute(
            &format!(
                "INSERT INTO {table} ({USER_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    email = excluded.email,
                    name = excluded.name,
                    token = excluded.token,
                    group_ids = excluded.group_ids,
                    updated_at = excluded.updated_at,
                    deleted_at = excluded.deleted_at"
            ),
            params![
                user.id,
                user.email,
                user.name,
                user.token,
                serde_json::to_string(&user.groups)?,
                created_at,
                updated_at,
                user.deleted_at.as_ref().map(format_datetime),
            ],
        )
        .map_err(|e| constraint_conflict(e, || format!("email {} is already in use", user.email)))?;

        tx.commit()?;
        Ok(user.id)
    }

    fn remove_user(&self, id: &str) -> Result<()> {
        let table = &self.names.users;
        let now = format_datetime(&Utc::now());
        let rows = self.conn().execute(
            &format!(
                "UPDATE {table} SET deleted_at = COALESCE(deleted_at, ?2), updated_at = ?2
                 WHERE id = ?1"
            ),
            params![id, now],
        )?;
        if rows == 0 {
            return Err(Error::not_found(format!("user {id}")));
        }
        Ok(())
    }

    // Group operations

    fn get_group(&self, id: &str) -> Result<Group> {
        let table = &self.names.groups;
        self.conn()
            .query_row(
                &format!("SELECT {GROUP_COLUMNS} FROM {table} WHERE id = ?1"),
                params![id],
                group_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found(format!("group {id}")))
    }

    fn list_groups(&self) -> Result<Vec<Group>> {
        let table = &self.names.groups;
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {GROUP_COLUMNS} FROM {table} ORDER BY name, id"))?;
        let groups = stmt
            .query_map([], group_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    fn put_group(&self, mut group: Group) -> Result<String> {
        let table = &self.names.groups;
        if group.id.is_empty() {
            group.id = Uuid::new_v4().to_string();
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let (created_at, updated_at) = stamps(&tx, table, "id", &group.id)?;
        tx.execute(
            &format!(
                "INSERT INTO {table} ({GROUP_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    user_ids = excluded.user_ids,
                    updated_at = excluded.updated_at"
            ),
            params![
                group.id,
                group.name,
                serde_json::to_string(&group.users)?,
                created_at,
                updated_at,
            ],
        )?;
        tx.commit()?;
        Ok(group.id)
    }

    fn remove_group(&self, id: &str) -> Result<()> {
        let table = &self.names.groups;
        let rows = self
            .conn()
            .execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])?;
        if rows == 0 {
            return Err(Error::not_found(format!("group {id}")));
        }
        Ok(())
    }

    // Policy operations

    fn get_policy(&self, id: &str) -> Result<Policy> {
        get_policy(&self.conn(), &self.names.policies, id)
    }

    fn put_policy(&self, policy: Policy) -> Result<String> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let id = upsert_policy(&tx, &self.names.policies, policy)?;
        tx.commit()?;
        Ok(id)
    }

    fn remove_policy(&self, id: &str) -> Result<()> {
        let table = &self.names.policies;
        let rows = self
            .conn()
            .execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])?;
        if rows == 0 {
            return Err(Error::not_found(format!("policy {id}")));
        }
        Ok(())
    }

    // Doc operations

    fn load_doc(&self, conn: &Connection, path: &str) -> Result<Doc> {
        let table = &self.names.docs;
        let (mut doc, policy_id) = conn
            .query_row(
                &format!("SELECT {DOC_COLUMNS} FROM {table} WHERE path = ?1"),
                params![path],
                doc_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found(path))?;
        doc.policy = hydrate_policy(conn, &self.names.policies, policy_id, &mut HashMap::new())?;
        Ok(doc)
    }

    fn get_doc(&self, path: &str) -> Result<Doc> {
        self.load_doc(&self.conn(), path)
    }

    fn put_doc(&self, doc: Doc) -> Result<String> {
        let table = &self.names.docs;
        if doc.path.is_empty() {
            return Err(Error::InvalidInput("doc path cannot be empty".to_string()));
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let policy_id = match doc.policy.clone() {
            Some(policy) => Some(upsert_policy(&tx, &self.names.policies, policy)?),
            None => None,
        };

        let previous_tags: BTreeSet<String> = tx
            .query_row(
                &format!("SELECT {DOC_COLUMNS} FROM {table} WHERE path = ?1"),
                params![doc.path],
                doc_from_row,
            )
            .optional()?
            .map(|(previous, _)| previous.tags)
            .unwrap_or_default();

        let (created_at, updated_at) = stamps(&tx, table, "path", &doc.path)?;
        tx.execute(
            &format!(
                "INSERT INTO {table} ({DOC_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(path) DO UPDATE SET
                    title = excluded.title,
                    is_dir = excluded.is_dir,
                    policy_id = excluded.policy_id,
                    tags = excluded.tags,
                    created_by = excluded.created_by,
                    updated_by = excluded.updated_by,
                    updated_at = excluded.updated_at"
            ),
            params![
                doc.path,
                doc.title,
                doc.is_dir,
                policy_id,
                serde_json::to_string(&doc.tags)?,
                doc.created_by,
                doc.updated_by,
                created_at,
                updated_at,
            ],
        )?;
        tx.commit()?;

        self.tags.update(&doc.path, &previous_tags, &doc.tags);
        Ok(doc.path)
    }

    fn remove_doc(&self, path: &str) -> Result<Doc> {
        let table = &self.names.docs;
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let doc = self.load_doc(&tx, path)?;
        tx.execute(&format!("DELETE FROM {table} WHERE path = ?1"), params![path])?;
        tx.commit()?;

        self.tags.remove(path, &doc.tags);
        Ok(doc)
    }

    fn list_docs(&self, query: &DocQuery) -> Result<Vec<Doc>> {
        let prefix = normalize_prefix(&query.prefix)?;
        let conn = self.conn();
        if !query.tags.is_empty() {
            self.refresh_tags(&conn)?;
        }

        let mut candidates = self.tags.candidates(&query.tags);
        if let Some(paths) = &query.paths {
            candidates = Some(match candidates {
                Some(tagged) => tagged.into_iter().filter(|p| paths.contains(p)).collect(),
                None => paths.iter().cloned().collect(),
            });
        }

        let rows = match candidates {
            Some(candidates) => {
                let mut wanted: Vec<String> = candidates
                    .into_iter()
                    .filter(|path| is_within(path, &prefix))
                    .collect();
                wanted.sort();
                self.fetch_docs(&conn, &wanted)?
            }
            None => self.scan_docs(&conn, &prefix)?,
        };

        // The tag index is only a hint; the records decide.
        let mut policies = HashMap::new();
        let mut docs = Vec::with_capacity(rows.len());
        for (mut doc, policy_id) in rows {
            if !doc.has_tags(&query.tags) || !is_within(&doc.path, &prefix) {
                continue;
            }
            if query.paths.as_ref().is_some_and(|paths| !paths.contains(&doc.path)) {
                continue;
            }
            doc.policy = hydrate_policy(&conn, &self.names.policies, policy_id, &mut policies)?;
            docs.push(doc);
        }
        docs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(docs)
    }

    fn fetch_docs(&self, conn: &Connection, paths: &[String]) -> Result<Vec<(Doc, Option<String>)>> {
        let table = &self.names.docs;
        let mut rows = Vec::with_capacity(paths.len());
        for chunk in paths.chunks(FETCH_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT {DOC_COLUMNS} FROM {table} WHERE path IN ({placeholders})"
            ))?;
            let fetched = stmt
                .query_map(params_from_iter(chunk.iter()), doc_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.extend(fetched);
        }
        Ok(rows)
    }

    fn scan_docs(&self, conn: &Connection, prefix: &str) -> Result<Vec<(Doc, Option<String>)>> {
        let table = &self.names.docs;
        if prefix == ROOT {
            let mut stmt =
                conn.prepare(&format!("SELECT {DOC_COLUMNS} FROM {table} ORDER BY path"))?;
            let rows = stmt
                .query_map([], doc_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            return Ok(rows);
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT {DOC_COLUMNS} FROM {table}
             WHERE path = ?1 OR substr(path, 1, length(?1) + 1) = ?1 || '/'
             ORDER BY path"
        ))?;
        let rows = stmt
            .query_map(params![prefix], doc_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn ensure_schema(&self) -> Result<()> {
        provision_all(&Collection::ALL, |collection| {
            let inner = Arc::clone(&self.inner);
            async move { tokio::task::spawn_blocking(move || inner.provision(collection)).await? }
        })
        .await?;
        self.rebuild_tag_index().await
    }

    async fn rebuild_tag_index(&self) -> Result<()> {
        self.blocking(|inner| inner.rebuild_tag_index()).await
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        let id = id.to_string();
        self.blocking(move |inner| inner.get_user(&id)).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User> {
        let email = email.to_string();
        self.blocking(move |inner| inner.get_user_by_email(&email))
            .await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.blocking(|inner| inner.list_users()).await
    }

    async fn put_user(&self, user: User) -> Result<String> {
        self.blocking(move |inner| inner.put_user(user)).await
    }

    async fn remove_user(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.blocking(move |inner| inner.remove_user(&id)).await
    }

    async fn get_group(&self, id: &str) -> Result<Group> {
        let id = id.to_string();
        self.blocking(move |inner| inner.get_group(&id)).await
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        self.blocking(|inner| inner.list_groups()).await
    }

    async fn put_group(&self, group: Group) -> Result<String> {
        self.blocking(move |inner| inner.put_group(group)).await
    }

    async fn remove_group(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.blocking(move |inner| inner.remove_group(&id)).await
    }

    async fn get_policy(&self, id: &str) -> Result<Policy> {
        let id = id.to_string();
        self.blocking(move |inner| inner.get_policy(&id)).await
    }

    async fn put_policy(&self, policy: Policy) -> Result<String> {
        self.blocking(move |inner| inner.put_policy(policy)).await
    }

    async fn remove_policy(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.blocking(move |inner| inner.remove_policy(&id)).await
    }

    async fn get_doc(&self, path: &str) -> Result<Doc> {
        let path = path.to_string();
        self.blocking(move |inner| inner.get_doc(&path)).await
    }

    async fn put_doc(&self, doc: Doc) -> Result<String> {
        self.blocking(move |inner| inner.put_doc(doc)).await
    }

    async fn remove_doc(&self, path: &str) -> Result<Doc> {
        let path = path.to_string();
        self.blocking(move |inner| inner.remove_doc(&path)).await
    }

    async fn list_docs(&self, query: &DocQuery) -> Result<Vec<Doc>> {
        let query = query.clone();
        self.blocking(move |inner| inner.list_docs(&query)).await
    }
}
