//! Frame payloads
//!
//! The `d` field of each op. Client payloads use camelCase field names,
//! like the REST request bodies.

use rolechat_common::ErrorResponse;
use rolechat_core::{BroadcastScope, DomainError, Snowflake};
use rolechat_service::dto::{SendMessageRequest, UserResponse};
use serde::{Deserialize, Serialize};

use super::OpCode;

/// Payload for `hello`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    #[must_use]
    pub fn with_interval(interval: std::time::Duration) -> Self {
        Self {
            heartbeat_interval: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Payload for `identify`
#[derive(Debug, Clone, Deserialize)]
pub struct IdentifyPayload {
    /// Session token, with or without a `Bearer ` prefix
    pub token: String,
}

impl IdentifyPayload {
    #[must_use]
    pub fn bare_token(&self) -> &str {
        self.token.strip_prefix("Bearer ").unwrap_or(&self.token).trim()
    }
}

/// Payload for `ready`
#[derive(Debug, Clone, Serialize)]
pub struct ReadyPayload {
    pub session_id: String,
    pub user: UserResponse,
}

/// Payload for `join_conversation` and `leave_conversation`
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRoomPayload {
    pub conversation_id: Snowflake,
}

/// Payload for `join_group` and `leave_group`
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRoomPayload {
    pub group_id: Snowflake,
}

/// Payload for `typing_start` and `typing_stop`: exactly one room
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingRoomPayload {
    pub conversation_id: Option<Snowflake>,
    pub group_id: Option<Snowflake>,
}

impl TypingRoomPayload {
    /// The room the typing indicator goes to
    ///
    /// # Errors
    /// Returns a validation error unless exactly one room is named
    pub fn scope(&self) -> Result<BroadcastScope, DomainError> {
        match (self.conversation_id, self.group_id) {
            (Some(id), None) => Ok(BroadcastScope::Conversation(id)),
            (None, Some(id)) => Ok(BroadcastScope::Group(id)),
            _ => Err(DomainError::ValidationError(
                "typing targets exactly one of conversationId or groupId".to_string(),
            )),
        }
    }
}

/// Payload for `send_message`: the REST send body plus a client-side id
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[serde(flatten)]
    pub request: SendMessageRequest,
    /// Echoed back so the client can settle its optimistic copy
    pub temp_id: Option<String>,
}

/// `dispatch` `message_sent`, to the sender only
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSentPayload {
    pub message_id: String,
    pub temp_id: Option<String>,
}

/// `dispatch` `message_error`, to the sender only
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageErrorPayload {
    pub temp_id: Option<String>,
    pub error: ErrorResponse,
}

/// Payload for `error`
#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    /// The op that failed
    pub op: OpCode,
    #[serde(flatten)]
    pub error: ErrorResponse,
}
