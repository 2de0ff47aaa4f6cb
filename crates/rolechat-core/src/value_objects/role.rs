//! User roles and their hierarchy levels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role. The set is closed: every user holds exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
    Admin,
    SuperAdmin,
}

impl Role {
    /// All roles, highest first
    pub const ALL: [Role; 4] = [Role::SuperAdmin, Role::Admin, Role::Teacher, Role::Student];

    /// Numeric hierarchy level: super_admin=4, admin=3, teacher=2, student=1
    #[inline]
    pub const fn level(self) -> u8 {
        match self {
            Role::SuperAdmin => 4,
            Role::Admin => 3,
            Role::Teacher => 2,
            Role::Student => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    /// Lenient parse used for values coming out of settings blobs.
    /// Unknown names resolve to `None`.
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim() {
            "super_admin" => Some(Role::SuperAdmin),
            "admin" => Some(Role::Admin),
            "teacher" => Some(Role::Teacher),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    /// Strictly higher in the hierarchy
    #[inline]
    pub fn outranks(self, other: Role) -> bool {
        self.level() > other.level()
    }

    /// Human label, e.g. "super admin"
    pub fn label(self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| RoleParseError(s.to_string()))
    }
}
