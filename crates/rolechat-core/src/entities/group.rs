//! Group entity and its membership records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::Snowflake;

/// A member's standing inside one group (independent of the account role)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Admin,
    Member,
}

impl GroupRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            GroupRole::Admin => "admin",
            GroupRole::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<GroupRole> {
        match s {
            "admin" => Some(GroupRole::Admin),
            "member" => Some(GroupRole::Member),
            _ => None,
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: Snowflake,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub created_by: Snowflake,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn new(id: Snowflake, name: String, created_by: Snowflake, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            description: None,
            avatar_url: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_owner(&self, user_id: Snowflake) -> bool {
        self.created_by == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub group_id: Snowflake,
    pub user_id: Snowflake,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
}

impl GroupMember {
    pub fn new(group_id: Snowflake, user_id: Snowflake, role: GroupRole, now: DateTime<Utc>) -> Self {
        Self {
            group_id,
            user_id,
            role,
            joined_at: now,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == GroupRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_role_names() {
        assert_eq!(GroupRole::parse("admin"), Some(GroupRole::Admin));
        assert_eq!(GroupRole::parse("member"), Some(GroupRole::Member));
        assert_eq!(GroupRole::parse("owner"), None);
        assert_eq!(serde_json::to_string(&GroupRole::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn test_owner_and_admin() {
        let now = Utc::now();
        let group = Group::new(Snowflake::new(5), "Physics".into(), Snowflake::new(1), now);
        assert!(group.is_owner(Snowflake::new(1)));
        assert!(!group.is_owner(Snowflake::new(2)));

        let member = GroupMember::new(group.id, Snowflake::new(2), GroupRole::Member, now);
        assert!(!member.is_admin());
    }
}
