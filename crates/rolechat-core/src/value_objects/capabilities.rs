//! Capability flags granted to roles
//!
//! The catalog is persisted by name (`chat_with_any_role`, `create_users`, ...);
//! in memory a role's grants collapse into one bitfield.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::Role;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        /// Message any role, bypassing every restriction table
        const CHAT_WITH_ANY_ROLE     = 1 << 0;
        const CHAT_CROSS_HIERARCHY   = 1 << 1;
        const CREATE_USERS           = 1 << 2;
        const MANAGE_LOWER_ROLES     = 1 << 3;
        const VIEW_ALL_CONVERSATIONS = 1 << 4;
        const DELETE_MESSAGES        = 1 << 5;
        const BAN_USERS              = 1 << 6;
        const MODIFY_USER_ROLES      = 1 << 7;
        const ACCESS_ADMIN_PANEL     = 1 << 8;
        const BROADCAST_MESSAGES     = 1 << 9;
    }
}

/// Catalog order. Seed grants hand out prefixes of this list.
const CATALOG: [(Capabilities, &str, &str); 10] = [
    (Capabilities::CHAT_WITH_ANY_ROLE, "chat_with_any_role", "communication"),
    (Capabilities::CHAT_CROSS_HIERARCHY, "chat_cross_hierarchy", "communication"),
    (Capabilities::CREATE_USERS, "create_users", "user_management"),
    (Capabilities::MANAGE_LOWER_ROLES, "manage_lower_roles", "user_management"),
    (Capabilities::VIEW_ALL_CONVERSATIONS, "view_all_conversations", "administration"),
    (Capabilities::DELETE_MESSAGES, "delete_messages", "moderation"),
    (Capabilities::BAN_USERS, "ban_users", "moderation"),
    (Capabilities::MODIFY_USER_ROLES, "modify_user_roles", "administration"),
    (Capabilities::ACCESS_ADMIN_PANEL, "access_admin_panel", "administration"),
    (Capabilities::BROADCAST_MESSAGES, "broadcast_messages", "communication"),
];

impl Capabilities {
    /// Look up a single capability by its catalog name
    pub fn from_catalog_name(name: &str) -> Option<Capabilities> {
        CATALOG
            .iter()
            .find(|(_, n, _)| *n == name)
            .map(|(flag, _, _)| *flag)
    }

    /// Catalog name of a single flag; `None` for empty or combined sets
    pub fn name(self) -> Option<&'static str> {
        CATALOG
            .iter()
            .find(|(flag, _, _)| *flag == self)
            .map(|(_, n, _)| *n)
    }

    pub fn category(self) -> Option<&'static str> {
        CATALOG
            .iter()
            .find(|(flag, _, _)| *flag == self)
            .map(|(_, _, c)| *c)
    }

    /// Names of every flag in the set, in catalog order
    pub fn names(&self) -> Vec<&'static str> {
        CATALOG
            .iter()
            .filter(|(flag, _, _)| self.contains(*flag))
            .map(|(_, n, _)| *n)
            .collect()
    }

    /// Build a set from catalog names, ignoring unknown ones
    pub fn from_names<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter_map(Capabilities::from_catalog_name)
            .fold(Capabilities::empty(), |acc, c| acc | c)
    }

    /// `(flag, name, category)` for every catalog entry
    pub fn catalog() -> impl Iterator<Item = (Capabilities, &'static str, &'static str)> {
        CATALOG.iter().copied()
    }

    /// Grants shipped with a fresh install
    pub fn seeded_for(role: Role) -> Self {
        let take = match role {
            Role::SuperAdmin => CATALOG.len(),
            Role::Admin => 4,
            Role::Teacher => 3,
            Role::Student => 0,
        };
        CATALOG[..take]
            .iter()
            .fold(Capabilities::empty(), |acc, (flag, _, _)| acc | *flag)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(","))
    }
}

// Names on the wire, never raw bits
impl Serialize for Capabilities {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.names().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Capabilities {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(Capabilities::from_names(names.iter().map(String::as_str)))
    }
}
