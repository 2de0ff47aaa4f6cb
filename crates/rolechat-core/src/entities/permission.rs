//! Permission records: the static per-role chat table, role settings blobs,
//! and capability grants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::{Capabilities, Role, Snowflake};

/// Settings key holding a [`ChatRestrictions`] blob
pub const CHAT_RESTRICTIONS_KEY: &str = "chat_restrictions";

/// One row per role: who the role may message and how many messages per day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPermission {
    pub role: Role,
    pub can_chat_with: Vec<Role>,
    /// `None` means unlimited
    pub daily_message_limit: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatPermission {
    pub fn new(
        role: Role,
        can_chat_with: Vec<Role>,
        daily_message_limit: Option<u32>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut can_chat_with = can_chat_with;
        can_chat_with.sort_by(|a, b| b.cmp(a));
        can_chat_with.dedup();
        Self {
            role,
            can_chat_with,
            daily_message_limit,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rows inserted by the initial migration
    pub fn seeded(role: Role, now: DateTime<Utc>) -> Self {
        let (can_chat_with, limit) = match role {
            Role::SuperAdmin => (Role::ALL.to_vec(), None),
            Role::Admin => (Role::ALL.to_vec(), Some(500)),
            Role::Teacher => (vec![Role::Admin, Role::Teacher, Role::Student], Some(200)),
            Role::Student => (vec![Role::Teacher], Some(50)),
        };
        Self::new(role, can_chat_with, limit, now)
    }

    pub fn allows(&self, recipient: Role) -> bool {
        self.can_chat_with.contains(&recipient)
    }
}

/// Shape of the `chat_restrictions` settings blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRestrictions {
    pub can_chat_with: Vec<Role>,
    pub max_daily_messages: Option<u32>,
}

impl ChatRestrictions {
    /// Parse a stored blob. Unknown role names are dropped rather than failing
    /// the whole override; a blob without a `can_chat_with` array is ignored.
    pub fn from_value(value: &Value) -> Option<Self> {
        let roles = value.get("can_chat_with")?.as_array()?;
        let can_chat_with = roles
            .iter()
            .filter_map(Value::as_str)
            .filter_map(Role::parse)
            .collect();
        let max_daily_messages = value
            .get("max_daily_messages")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok());
        Some(Self {
            can_chat_with,
            max_daily_messages,
        })
    }

    pub fn allows(&self, recipient: Role) -> bool {
        self.can_chat_with.contains(&recipient)
    }
}

/// Arbitrary per-role settings entry
#[derive(Debug, Clone, PartialEq)]
pub struct RoleSetting {
    pub role: Role,
    pub key: String,
    pub value: Value,
    pub created_by: Option<Snowflake>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoleSetting {
    pub fn new(
        role: Role,
        key: impl Into<String>,
        value: Value,
        created_by: Option<Snowflake>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            role,
            key: key.into(),
            value,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// The chat restriction override, if this entry is one and parses
    pub fn chat_restrictions(&self) -> Option<ChatRestrictions> {
        if self.key == CHAT_RESTRICTIONS_KEY {
            ChatRestrictions::from_value(&self.value)
        } else {
            None
        }
    }
}

/// A single capability granted to a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCapability {
    pub role: Role,
    pub capability: Capabilities,
    pub granted_by: Option<Snowflake>,
    pub created_at: DateTime<Utc>,
}
