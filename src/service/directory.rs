use std::sync::Arc;

use crate::access::is_member;
use crate::auth::TokenGenerator;
use crate::error::{Error, Result};
use crate::store::MetadataStore;
use crate::types::{Group, Policy, User};

/// Users, groups and policies, and the credentials that identify users.
pub struct Directory {
    store: Arc<dyn MetadataStore>,
    tokens: TokenGenerator,
}

impl Directory {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self {
            store,
            tokens: TokenGenerator::new(),
        }
    }

    /// Creates a user with a fresh credential. The raw token is returned once
    /// and only its hash is kept.
    pub async fn create_user(&self, email: &str, name: &str) -> Result<(User, String)> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidInput(format!("invalid email '{email}'")));
        }

        let tokens = self.tokens.clone();
        let (raw_token, hash) = tokio::task::spawn_blocking(move || tokens.generate()).await??;

        let mut user = User::new(email, name.trim());
        user.token = hash;
        let id = self.store.put_user(user).await?;
        let user = self.store.get_user(&id).await?;

        tracing::info!(user = %user.id, email = %user.email, "created user");
        Ok((user, raw_token))
    }

    /// Resolves an `email` and `token` pair to an active user.
    ///
    /// Unknown emails, removed users and wrong tokens all fail the same way.
    pub async fn authenticate(&self, email: &str, token: &str) -> Result<User> {
        let user = match self.store.get_user_by_email(email).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                tracing::info!(%email, "authentication failed: unknown user");
                return Err(Error::Unauthenticated);
            }
            Err(e) => return Err(e),
        };
        if user.is_deleted() {
            tracing::info!(%email, "authentication failed: user removed");
            return Err(Error::Unauthenticated);
        }

        let tokens = self.tokens.clone();
        let token = token.to_string();
        let hash = user.token.clone();
        let verified = tokio::task::spawn_blocking(move || tokens.verify(&token, &hash)).await?;
        if !verified {
            tracing::info!(%email, "authentication failed: bad token");
            return Err(Error::Unauthenticated);
        }
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Result<User> {
        self.store.get_user(id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.store.list_users().await
    }

    pub async fn remove_user(&self, id: &str) -> Result<()> {
        self.store.remove_user(id).await?;
        tracing::info!(user = %id, "removed user");
        Ok(())
    }

    /// Creates a group with `acting` as its first member, or renames an
    /// existing group `acting` belongs to. Membership changes go through
    /// [`Directory::add_member`] and [`Directory::remove_member`].
    pub async fn put_group(&self, group: Group, acting: &User) -> Result<String> {
        let name = group.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput("group name cannot be empty".to_string()));
        }

        if !group.id.is_empty() {
            let mut existing = self.member_group(&group.id, acting).await?;
            existing.name = name;
            return self.store.put_group(existing).await;
        }

        let mut created = Group::new(name);
        created.users.insert(acting.id.clone());
        let id = self.store.put_group(created).await?;
        self.link_user(&id, &acting.id).await?;
        tracing::info!(group = %id, user = %acting.id, "created group");
        Ok(id)
    }

    pub async fn get_group(&self, id: &str) -> Result<Group> {
        self.store.get_group(id).await
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        self.store.list_groups().await
    }

    pub async fn remove_group(&self, id: &str, acting: &User) -> Result<()> {
        self.member_group(id, acting).await?;
        // Members keep the dangling id; it is skipped wherever it is resolved.
        self.store.remove_group(id).await
    }

    /// Adds `user_id` to `group_id`, recording the membership on both records.
    /// Only members may add others.
    pub async fn add_member(&self, group_id: &str, user_id: &str, acting: &User) -> Result<Group> {
        let mut group = self.member_group(group_id, acting).await?;
        let user = self.store.get_user(user_id).await?;

        if group.users.insert(user.id.clone()) {
            self.store.put_group(group).await?;
        }
        self.link_user(group_id, &user.id).await?;
        self.store.get_group(group_id).await
    }

    /// Removes `user_id` from `group_id`. Members may remove anyone and users
    /// may always leave. A user that no longer exists is only dropped from the
    /// group side.
    pub async fn remove_member(&self, group_id: &str, user_id: &str, acting: &User) -> Result<Group> {
        let mut group = if acting.id == user_id {
            self.store.get_group(group_id).await?
        } else {
            self.member_group(group_id, acting).await?
        };
        if group.users.remove(user_id) {
            self.store.put_group(group).await?;
        }

        match self.store.get_user(user_id).await {
            Ok(mut user) => {
                if user.groups.remove(group_id) {
                    self.store.put_user(user).await?;
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
        self.store.get_group(group_id).await
    }

    /// Active members of a group. Ids that no longer resolve are skipped.
    pub async fn group_members(&self, group_id: &str) -> Result<Vec<User>> {
        let group = self.store.get_group(group_id).await?;
        let mut members = Vec::with_capacity(group.users.len());
        for id in &group.users {
            match self.store.get_user(id).await {
                Ok(user) if !user.is_deleted() => members.push(user),
                Ok(_) => {}
                Err(e) if e.is_not_found() => {
                    tracing::debug!(group = %group_id, user = %id, "skipping dangling member");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(members)
    }

    /// Stores a policy. A new policy always gets a fresh id. Updating an
    /// existing one needs membership in it and fails on read-only policies.
    pub async fn put_policy(&self, mut policy: Policy, acting: &User) -> Result<String> {
        if policy.id.is_empty() {
            return self.store.put_policy(policy).await;
        }
        let existing = self.writable_policy(&policy.id, acting).await?;
        policy.id = existing.id;
        self.store.put_policy(policy).await
    }

    /// A policy `acting` is not named in is reported as missing.
    pub async fn get_policy(&self, id: &str, acting: &User) -> Result<Policy> {
        let policy = self.store.get_policy(id).await?;
        if !is_member(acting, &policy) {
            return Err(Error::not_found(format!("policy {id}")));
        }
        Ok(policy)
    }

    pub async fn remove_policy(&self, id: &str, acting: &User) -> Result<()> {
        self.writable_policy(id, acting).await?;
        self.store.remove_policy(id).await
    }

    async fn writable_policy(&self, id: &str, acting: &User) -> Result<Policy> {
        let policy = self.get_policy(id, acting).await?;
        if policy.read_only {
            return Err(Error::Forbidden);
        }
        Ok(policy)
    }

    async fn member_group(&self, id: &str, acting: &User) -> Result<Group> {
        let group = self.store.get_group(id).await?;
        if !group.users.contains(&acting.id) {
            return Err(Error::Forbidden);
        }
        Ok(group)
    }

    async fn link_user(&self, group_id: &str, user_id: &str) -> Result<()> {
        let mut user = self.store.get_user(user_id).await?;
        if user.groups.insert(group_id.to_string()) {
            self.store.put_user(user).await?;
        }
        Ok(())
    }
}
