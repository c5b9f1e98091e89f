use serde::{Deserialize, Serialize};

use crate::types::User;

#[derive(Debug, Serialize)]
pub struct PathResponse {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListDocsParams {
    /// Path prefix (starting with `/`) or search term.
    #[serde(default)]
    pub query: Option<String>,
    /// Comma-separated tags, all of which must be present.
    #[serde(default)]
    pub tags: Option<String>,
}

impl ListDocsParams {
    #[must_use]
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveDocParams {
    /// Also remove the doc's policy.
    #[serde(default)]
    pub purge: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user: User,
    /// Shown once; only a hash is stored.
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    pub user_id: String,
}
