//! Actors, users and groups

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated principal performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub username: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
        }
    }
}

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    /// Directly assigned role ids
    pub roles: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// Group entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    /// Ids of the users in the group
    pub members: Vec<String>,
    /// Directly assigned role ids
    pub roles: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// A user or a group, as returned after role revocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Member {
    User(User),
    Group(Group),
}

impl Member {
    pub fn id(&self) -> &str {
        match self {
            Member::User(u) => &u.id,
            Member::Group(g) => &g.id,
        }
    }

    pub fn roles(&self) -> &[String] {
        match self {
            Member::User(u) => &u.roles,
            Member::Group(g) => &g.roles,
        }
    }
}

/// Remove every id of `revoked` from `roles`; returns whether anything changed.
pub fn revoke_from(roles: &mut Vec<String>, revoked: &[String]) -> bool {
    let before = roles.len();
    roles.retain(|r| !revoked.contains(r));
    roles.len() != before
}
