//! User entity - an account with a role and presence state

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{Role, Snowflake};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Snowflake,
    pub name: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a user that other users may see next to their messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: Snowflake,
    pub name: String,
    pub role: Role,
    pub avatar_url: Option<String>,
}

impl User {
    pub fn new(id: Snowflake, name: String, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            role,
            avatar_url: None,
            is_online: false,
            last_seen: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_avatar(mut self, avatar_url: Option<String>) -> Self {
        self.avatar_url = avatar_url;
        self
    }

    pub fn profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            name: self.name.clone(),
            role: self.role,
            avatar_url: self.avatar_url.clone(),
        }
    }

    /// Record a presence signal. Returns true when `is_online` flipped.
    pub fn set_presence(&mut self, online: bool, at: DateTime<Utc>) -> bool {
        let changed = self.is_online != online;
        self.is_online = online;
        if at > self.last_seen {
            self.last_seen = at;
        }
        self.updated_at = at;
        changed
    }

    /// Online, but silent for longer than `grace`
    pub fn is_stale(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        self.is_online && now - self.last_seen > grace
    }
}
