//! Realtime events fanned out to connected clients
//!
//! On the wire every event is `{"event": <name>, "data": <payload>, "timestamp": ...}`.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::change_event::Collection;
use crate::value_objects::Snowflake;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NewMessage,
    MessageRead,
    UserTyping,
    UserStoppedTyping,
    UserStatusChanged,
    /// A member lost access to a group or conversation room
    RoomAccessRevoked,
    /// Raw change-feed mirror, named `<collection>_change`
    Change(Collection),
}

impl EventKind {
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            Self::NewMessage => Cow::Borrowed("new_message"),
            Self::MessageRead => Cow::Borrowed("message_read"),
            Self::UserTyping => Cow::Borrowed("user_typing"),
            Self::UserStoppedTyping => Cow::Borrowed("user_stopped_typing"),
            Self::UserStatusChanged => Cow::Borrowed("user_status_changed"),
            Self::RoomAccessRevoked => Cow::Borrowed("room_access_revoked"),
            Self::Change(collection) => Cow::Borrowed(collection.event_name()),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "new_message" => Some(Self::NewMessage),
            "message_read" => Some(Self::MessageRead),
            "user_typing" => Some(Self::UserTyping),
            "user_stopped_typing" => Some(Self::UserStoppedTyping),
            "user_status_changed" => Some(Self::UserStatusChanged),
            "room_access_revoked" => Some(Self::RoomAccessRevoked),
            other => Collection::from_event_name(other).map(Self::Change),
        }
    }
}

/// An event ready for publishing
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeEvent {
    pub kind: EventKind,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl RealtimeEvent {
    pub fn new(kind: EventKind, data: Value) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Serialize `payload` as the event data
    pub fn from_payload<T: Serialize>(kind: EventKind, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(kind, serde_json::to_value(payload)?))
    }

    pub fn name(&self) -> Cow<'static, str> {
        self.kind.name()
    }
}

#[derive(Serialize, Deserialize)]
struct WireEvent {
    event: String,
    #[serde(default)]
    data: Value,
    timestamp: DateTime<Utc>,
}

impl Serialize for RealtimeEvent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireEvent {
            event: self.name().into_owned(),
            data: self.data.clone(),
            timestamp: self.timestamp,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RealtimeEvent {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireEvent::deserialize(deserializer)?;
        let kind = EventKind::parse(&wire.event)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown event: {}", wire.event)))?;
        Ok(Self {
            kind,
            data: wire.data,
            timestamp: wire.timestamp,
        })
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReadPayload {
    pub message_id: Snowflake,
    pub read_by: Snowflake,
    pub read_at: DateTime<Utc>,
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub user_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Snowflake>,
}

/// `user_id` is the member who lost access; `None` means everyone in the room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAccessRevokedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Snowflake>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusPayload {
    pub user_id: Snowflake,
    #[serde(rename = "is_online")]
    pub is_online: bool,
    #[serde(rename = "last_seen")]
    pub last_seen: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_names() {
        assert_eq!(EventKind::NewMessage.name(), "new_message");
        assert_eq!(EventKind::UserStatusChanged.name(), "user_status_changed");
        assert_eq!(EventKind::Change(Collection::Messages).name(), "message_change");
        assert_eq!(
            EventKind::parse("conversation_change"),
            Some(EventKind::Change(Collection::Conversations))
        );
        assert_eq!(EventKind::parse("room_access_revoked"), Some(EventKind::RoomAccessRevoked));
        assert_eq!(EventKind::parse("nope"), None);
    }

    #[test]
    fn test_wire_shape() {
        let event = RealtimeEvent::new(EventKind::MessageRead, json!({"messageId": "1"}));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "message_read");
        assert_eq!(value["data"]["messageId"], "1");

        let back: RealtimeEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_status_payload_field_names() {
        let payload = UserStatusPayload {
            user_id: Snowflake::new(9),
            is_online: true,
            last_seen: Utc::now(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["userId"], "9");
        assert_eq!(value["is_online"], true);
        assert!(value.get("last_seen").is_some());
    }

    #[test]
    fn test_typing_payload_skips_missing_target() {
        let payload = TypingPayload {
            user_id: Snowflake::new(1),
            user_name: Some("Sarah".into()),
            conversation_id: Some(Snowflake::new(2)),
            group_id: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("groupId").is_none());
        assert_eq!(value["conversationId"], "2");
    }
}
