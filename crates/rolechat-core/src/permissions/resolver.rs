//! Permission resolver - decides whether one role may message another

use std::collections::HashMap;

use crate::entities::{ChatPermission, ChatRestrictions, RoleCapability, RoleSetting};
use crate::value_objects::{Capabilities, Role};

use super::rules::{
    CapabilityGrant, CommunicationRule, HierarchyDefault, RuleInput, SettingsOverride, StaticTable,
};

/// Read-mostly view of every permission table, keyed by role.
///
/// Built once from the repositories and shared behind an `Arc` until a
/// change invalidates it.
#[derive(Debug, Clone, Default)]
pub struct PermissionSnapshot {
    table: HashMap<Role, ChatPermission>,
    settings: HashMap<Role, ChatRestrictions>,
    capabilities: HashMap<Role, Capabilities>,
}

impl PermissionSnapshot {
    pub fn new(
        table: Vec<ChatPermission>,
        settings: Vec<RoleSetting>,
        grants: Vec<RoleCapability>,
    ) -> Self {
        let table = table.into_iter().map(|row| (row.role, row)).collect();

        let settings = settings
            .iter()
            .filter_map(|s| s.chat_restrictions().map(|r| (s.role, r)))
            .collect();

        let mut capabilities: HashMap<Role, Capabilities> = HashMap::new();
        for grant in grants {
            *capabilities.entry(grant.role).or_default() |= grant.capability;
        }

        Self {
            table,
            settings,
            capabilities,
        }
    }

    /// Seed rows and seed grants, no settings overrides
    pub fn seeded(now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            table: Role::ALL
                .into_iter()
                .map(|role| (role, ChatPermission::seeded(role, now)))
                .collect(),
            settings: HashMap::new(),
            capabilities: Role::ALL
                .into_iter()
                .map(|role| (role, Capabilities::seeded_for(role)))
                .collect(),
        }
    }

    pub fn chat_permission(&self, role: Role) -> Option<&ChatPermission> {
        self.table.get(&role)
    }

    pub fn restrictions(&self, role: Role) -> Option<&ChatRestrictions> {
        self.settings.get(&role)
    }

    pub fn capabilities(&self, role: Role) -> Capabilities {
        self.capabilities.get(&role).copied().unwrap_or_default()
    }

    #[inline]
    pub fn has_capability(&self, role: Role, capability: Capabilities) -> bool {
        self.capabilities(role).contains(capability)
    }

    /// Effective daily limit: settings override, then static table, else unlimited
    pub fn daily_limit(&self, role: Role) -> Option<u32> {
        if let Some(restrictions) = self.settings.get(&role) {
            return restrictions.max_daily_messages;
        }
        self.table
            .get(&role)
            .and_then(|row| row.daily_message_limit)
    }

    pub fn rule_input(&self, sender: Role, recipient: Role) -> RuleInput<'_> {
        RuleInput {
            sender,
            recipient,
            capabilities: self.capabilities(sender),
            settings_override: self
                .settings
                .get(&sender)
                .map(|r| r.can_chat_with.as_slice()),
            static_table: self.table.get(&sender).map(|r| r.can_chat_with.as_slice()),
        }
    }
}

/// Outcome of a resolution, naming the rule that settled it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    pub rule: &'static str,
}

/// Chain of [`CommunicationRule`]s in fixed precedence:
/// capability grant > settings override > static table > hierarchy default.
pub struct PermissionResolver {
    rules: Vec<Box<dyn CommunicationRule>>,
}

impl PermissionResolver {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(CapabilityGrant),
                Box::new(SettingsOverride),
                Box::new(StaticTable),
                Box::new(HierarchyDefault),
            ],
        }
    }

    /// Walk the chain. If every rule defers, the answer is no.
    pub fn resolve(&self, input: &RuleInput<'_>) -> Verdict {
        self.rules
            .iter()
            .find_map(|rule| {
                rule.decide(input).map(|allowed| Verdict {
                    allowed,
                    rule: rule.name(),
                })
            })
            .unwrap_or(Verdict {
                allowed: false,
                rule: "none",
            })
    }

    pub fn can_communicate(
        &self,
        snapshot: &PermissionSnapshot,
        sender: Role,
        recipient: Role,
    ) -> bool {
        self.resolve(&snapshot.rule_input(sender, recipient)).allowed
    }

    /// Roles `sender` may reach, highest first. Used to filter contact lists.
    pub fn reachable_roles(&self, snapshot: &PermissionSnapshot, sender: Role) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|recipient| self.can_communicate(snapshot, sender, *recipient))
            .collect()
    }
}

impl Default for PermissionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| r.name()))
            .finish()
    }
}

/// One-shot form of the resolver.
///
/// `override_restrictions` is the sender role's `can_chat_with` list, from
/// settings or from the static table; `has_capability` answers capability
/// checks for the sender.
pub fn can_communicate(
    sender: Role,
    recipient: Role,
    override_restrictions: Option<&[Role]>,
    has_capability: Option<&dyn Fn(Capabilities) -> bool>,
) -> bool {
    let capabilities = match has_capability {
        Some(check) if check(Capabilities::CHAT_WITH_ANY_ROLE) => Capabilities::CHAT_WITH_ANY_ROLE,
        _ => Capabilities::empty(),
    };
    let input = RuleInput {
        capabilities,
        settings_override: override_restrictions,
        ..RuleInput::bare(sender, recipient)
    };
    PermissionResolver::new().resolve(&input).allowed
}

/// Same as [`can_communicate`] for untyped role names; unknown roles are denied
pub fn can_communicate_by_name(sender: &str, recipient: &str) -> bool {
    match (Role::parse(sender), Role::parse(recipient)) {
        (Some(sender), Some(recipient)) => can_communicate(sender, recipient, None, None),
        _ => false,
    }
}
