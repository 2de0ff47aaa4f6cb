//! Administrative actions gated by capability, with a role-based fallback

use crate::value_objects::{Capabilities, Role};

use super::PermissionSnapshot;

/// Roles that may perform `action` when no capability grant says so
fn fallback_roles(action: Capabilities) -> &'static [Role] {
    const ADMINS: &[Role] = &[Role::SuperAdmin, Role::Admin];

    if action == Capabilities::CREATE_USERS {
        &[Role::SuperAdmin, Role::Admin, Role::Teacher]
    } else if action == Capabilities::MODIFY_USER_ROLES {
        &[Role::SuperAdmin]
    } else if action.intersects(
        Capabilities::MANAGE_LOWER_ROLES
            | Capabilities::ACCESS_ADMIN_PANEL
            | Capabilities::DELETE_MESSAGES
            | Capabilities::BAN_USERS
            | Capabilities::VIEW_ALL_CONVERSATIONS
            | Capabilities::BROADCAST_MESSAGES,
    ) {
        ADMINS
    } else {
        &[]
    }
}

/// A capability grant wins; otherwise the static role→action map decides
pub fn can_perform(snapshot: &PermissionSnapshot, role: Role, action: Capabilities) -> bool {
    snapshot.has_capability(role, action) || fallback_roles(action).contains(&role)
}

/// Roles a user of `creator` role may create accounts for
pub fn creatable_roles(snapshot: &PermissionSnapshot, creator: Role) -> &'static [Role] {
    let granted = snapshot.has_capability(creator, Capabilities::CREATE_USERS);
    match (creator, granted) {
        (Role::SuperAdmin, true) => &[Role::SuperAdmin, Role::Admin, Role::Teacher, Role::Student],
        (Role::SuperAdmin, false) => &[Role::Admin, Role::Teacher, Role::Student],
        (Role::Admin, _) => &[Role::Teacher, Role::Student],
        (Role::Teacher, _) => &[Role::Student],
        (Role::Student, _) => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_fallback_map_without_grants() {
        let empty = PermissionSnapshot::default();
        assert!(can_perform(&empty, Role::Teacher, Capabilities::CREATE_USERS));
        assert!(!can_perform(&empty, Role::Student, Capabilities::CREATE_USERS));
        assert!(can_perform(&empty, Role::Admin, Capabilities::DELETE_MESSAGES));
        assert!(!can_perform(&empty, Role::Teacher, Capabilities::DELETE_MESSAGES));
        assert!(can_perform(&empty, Role::SuperAdmin, Capabilities::MODIFY_USER_ROLES));
        assert!(!can_perform(&empty, Role::Admin, Capabilities::MODIFY_USER_ROLES));
        assert!(!can_perform(&empty, Role::SuperAdmin, Capabilities::CHAT_CROSS_HIERARCHY));
    }

    #[test]
    fn test_grant_extends_fallback() {
        let mut snapshot = PermissionSnapshot::default();
        assert!(!can_perform(&snapshot, Role::Teacher, Capabilities::DELETE_MESSAGES));

        snapshot = PermissionSnapshot::new(
            vec![],
            vec![],
            vec![crate::entities::RoleCapability {
                role: Role::Teacher,
                capability: Capabilities::DELETE_MESSAGES,
                granted_by: None,
                created_at: Utc::now(),
            }],
        );
        assert!(can_perform(&snapshot, Role::Teacher, Capabilities::DELETE_MESSAGES));
    }

    #[test]
    fn test_creatable_roles() {
        let seeded = PermissionSnapshot::seeded(Utc::now());
        let empty = PermissionSnapshot::default();

        assert_eq!(creatable_roles(&seeded, Role::SuperAdmin).len(), 4);
        assert_eq!(
            creatable_roles(&empty, Role::SuperAdmin),
            &[Role::Admin, Role::Teacher, Role::Student]
        );
        assert_eq!(creatable_roles(&seeded, Role::Admin), &[Role::Teacher, Role::Student]);
        assert_eq!(creatable_roles(&seeded, Role::Teacher), &[Role::Student]);
        assert!(creatable_roles(&seeded, Role::Student).is_empty());
    }
}
