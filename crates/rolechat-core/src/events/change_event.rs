//! Change-feed events mirrored from the persistence layer

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persisted collections that emit change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Conversations,
    Messages,
    Groups,
    ChatPermissions,
    RoleSettings,
    RoleCapabilities,
}

impl Collection {
    /// Table / collection name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Conversations => "conversations",
            Self::Messages => "messages",
            Self::Groups => "groups",
            Self::ChatPermissions => "chat_permissions",
            Self::RoleSettings => "role_settings",
            Self::RoleCapabilities => "role_capabilities",
        }
    }

    /// Realtime event name for this collection's changes
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Users => "user_change",
            Self::Conversations => "conversation_change",
            Self::Messages => "message_change",
            Self::Groups => "group_change",
            Self::ChatPermissions => "chat_permission_change",
            Self::RoleSettings => "role_setting_change",
            Self::RoleCapabilities => "role_capability_change",
        }
    }

    const ALL: [Collection; 7] = [
        Self::Users,
        Self::Conversations,
        Self::Messages,
        Self::Groups,
        Self::ChatPermissions,
        Self::RoleSettings,
        Self::RoleCapabilities,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.event_name() == name)
    }

    /// Changes here make any cached permission snapshot stale
    pub const fn affects_permissions(self) -> bool {
        matches!(
            self,
            Self::ChatPermissions | Self::RoleSettings | Self::RoleCapabilities
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Insert,
    Update,
    Delete,
}

/// One row-level change as reported by the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub operation: ChangeOperation,
    /// Primary key of the changed row, rendered as text
    #[serde(default)]
    pub id: Option<String>,
    /// Row image after the change (before it, for deletes)
    #[serde(default)]
    pub document: Value,
    /// The row was too large to notify; `document` holds only its routing keys
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_names() {
        for c in Collection::ALL {
            assert_eq!(Collection::parse(c.as_str()), Some(c));
            assert_eq!(Collection::from_event_name(c.event_name()), Some(c));
        }
        assert!(Collection::RoleSettings.affects_permissions());
        assert!(!Collection::Messages.affects_permissions());
    }

    #[test]
    fn test_parse_notification_payload() {
        let raw = json!({
            "collection": "messages",
            "operation": "insert",
            "id": "123",
            "document": {"content": "hi"}
        });
        let event: ChangeEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.collection, Collection::Messages);
        assert_eq!(event.operation, ChangeOperation::Insert);
        assert_eq!(event.id.as_deref(), Some("123"));
    }
}
