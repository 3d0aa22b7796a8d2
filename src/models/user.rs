//! User model, as published by the identity provider.

use serde::{Deserialize, Serialize};

/// Caller role carried in the session token and the user directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// User profile. The core only reads these; the identity provider owns them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable user ID (also used as document ID)
    pub id: String,
    /// Display name, copied into submissions and leaderboard rows
    pub name: String,
    #[serde(default)]
    pub role: Role,
    /// Avatar URL
    #[serde(default)]
    pub avatar: Option<String>,
}
