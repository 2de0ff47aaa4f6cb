//! Permission resolution
//!
//! Whether a sender role may message a recipient role is answered by a short
//! chain of rules, each either settling the question or deferring:
//!
//! 1. capability grant (`chat_with_any_role`)
//! 2. the role's `chat_restrictions` settings override
//! 3. the role's static `chat_permissions` row
//! 4. the level-based hierarchy default
//!
//! Everything here is pure; the tables arrive as a [`PermissionSnapshot`].

mod actions;
mod resolver;
mod rules;

pub use actions::{can_perform, creatable_roles};
pub use resolver::{
    can_communicate, can_communicate_by_name, PermissionResolver, PermissionSnapshot, Verdict,
};
pub use rules::{
    CapabilityGrant, CommunicationRule, HierarchyDefault, RuleInput, SettingsOverride, StaticTable,
};
