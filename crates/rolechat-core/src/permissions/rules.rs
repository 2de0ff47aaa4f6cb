//! Communication rules consulted in order until one is authoritative

use crate::value_objects::{Capabilities, Role};

/// Everything a rule may look at for one sender → recipient decision
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub sender: Role,
    pub recipient: Role,
    /// Capabilities granted to the sender's role
    pub capabilities: Capabilities,
    /// `can_chat_with` from the sender role's `chat_restrictions` setting
    pub settings_override: Option<&'a [Role]>,
    /// `can_chat_with` from the sender role's static table row
    pub static_table: Option<&'a [Role]>,
}

impl<'a> RuleInput<'a> {
    /// Input with no capabilities and no tables: only the hierarchy decides
    pub fn bare(sender: Role, recipient: Role) -> Self {
        Self {
            sender,
            recipient,
            capabilities: Capabilities::empty(),
            settings_override: None,
            static_table: None,
        }
    }
}

/// One link of the resolver chain.
///
/// `Some(verdict)` ends the evaluation; `None` passes to the next rule.
pub trait CommunicationRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn decide(&self, input: &RuleInput<'_>) -> Option<bool>;
}

/// `chat_with_any_role` lets the holder message anyone
#[derive(Debug, Default, Clone, Copy)]
pub struct CapabilityGrant;

impl CommunicationRule for CapabilityGrant {
    fn name(&self) -> &'static str {
        "capability_grant"
    }

    fn decide(&self, input: &RuleInput<'_>) -> Option<bool> {
        input
            .capabilities
            .contains(Capabilities::CHAT_WITH_ANY_ROLE)
            .then_some(true)
    }
}

/// A role setting's `can_chat_with` list is authoritative when present
#[derive(Debug, Default, Clone, Copy)]
pub struct SettingsOverride;

impl CommunicationRule for SettingsOverride {
    fn name(&self) -> &'static str {
        "settings_override"
    }

    fn decide(&self, input: &RuleInput<'_>) -> Option<bool> {
        input
            .settings_override
            .map(|allowed| allowed.contains(&input.recipient))
    }
}

/// The static per-role table is authoritative when the role has a row
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticTable;

impl CommunicationRule for StaticTable {
    fn name(&self) -> &'static str {
        "static_table"
    }

    fn decide(&self, input: &RuleInput<'_>) -> Option<bool> {
        input
            .static_table
            .map(|allowed| allowed.contains(&input.recipient))
    }
}

/// Level-based fallback; always answers.
///
/// super_admin reaches everyone, a student reaches only teachers, every other
/// role reaches roles at most one level away.
#[derive(Debug, Default, Clone, Copy)]
pub struct HierarchyDefault;

impl HierarchyDefault {
    pub fn allows(sender: Role, recipient: Role) -> bool {
        match sender {
            Role::SuperAdmin => true,
            Role::Student => recipient == Role::Teacher,
            _ => sender.level().abs_diff(recipient.level()) <= 1,
        }
    }
}

impl CommunicationRule for HierarchyDefault {
    fn name(&self) -> &'static str {
        "hierarchy_default"
    }

    fn decide(&self, input: &RuleInput<'_>) -> Option<bool> {
        Some(Self::allows(input.sender, input.recipient))
    }
}
