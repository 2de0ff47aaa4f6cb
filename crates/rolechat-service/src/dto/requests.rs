//! Request DTOs for API endpoints
//!
//! Body DTOs implement `Deserialize` and `Validate`; query DTOs only
//! `Deserialize`. Field names are camelCase on the wire.

use rolechat_core::entities::MessageKind;
use rolechat_core::{DomainError, Role, Snowflake};
use serde::Deserialize;
use validator::Validate;

/// Parse a Snowflake sent as a string
pub fn parse_id(field: &'static str, raw: &str) -> Result<Snowflake, DomainError> {
    Snowflake::parse(raw.trim())
        .map_err(|_| DomainError::ValidationError(format!("{field} is not a valid id")))
}

// ============================================================================
// Auth Requests
// ============================================================================

/// Session request. Credential checks belong to the identity provider; this
/// stand-in issues a token for an existing user id.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_id: String,
}

// ============================================================================
// User Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be 2-50 characters"))]
    pub name: String,

    pub role: Role,

    #[validate(url(message = "Avatar must be a valid URL"))]
    #[serde(alias = "avatar_url")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOnlineStatusRequest {
    #[serde(alias = "is_online")]
    pub is_online: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<Role>,
}

// ============================================================================
// Conversation Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub participant_id: String,
}

// ============================================================================
// Message Requests
// ============================================================================

/// Send message request:
/// `{senderId, content, targetType, conversationId?, recipientId?, groupId?}`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Must match the caller when present
    pub sender_id: Option<String>,

    #[validate(length(min = 1, max = 1000, message = "Content must be 1-1000 characters"))]
    pub content: String,

    pub target_type: MessageKind,

    pub conversation_id: Option<String>,

    /// Counterpart of a direct message whose conversation may not exist yet
    pub recipient_id: Option<String>,

    pub group_id: Option<String>,
}

/// Where a send request points, once its shape has been checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTarget {
    Conversation(Snowflake),
    Recipient(Snowflake),
    Group(Snowflake),
}

impl SendMessageRequest {
    pub fn conversation(content: impl Into<String>, conversation_id: Snowflake) -> Self {
        Self {
            sender_id: None,
            content: content.into(),
            target_type: MessageKind::Conversation,
            conversation_id: Some(conversation_id.to_string()),
            recipient_id: None,
            group_id: None,
        }
    }

    pub fn direct(content: impl Into<String>, recipient_id: Snowflake) -> Self {
        Self {
            sender_id: None,
            content: content.into(),
            target_type: MessageKind::Conversation,
            conversation_id: None,
            recipient_id: Some(recipient_id.to_string()),
            group_id: None,
        }
    }

    pub fn group(content: impl Into<String>, group_id: Snowflake) -> Self {
        Self {
            sender_id: None,
            content: content.into(),
            target_type: MessageKind::Group,
            conversation_id: None,
            recipient_id: None,
            group_id: Some(group_id.to_string()),
        }
    }

    /// Resolve the target fields against `target_type`.
    ///
    /// A conversation send names exactly one of `conversationId` and
    /// `recipientId`; a group send names only `groupId`.
    pub fn target(&self) -> Result<SendTarget, DomainError> {
        let conversation = self.conversation_id.as_deref();
        let recipient = self.recipient_id.as_deref();
        let group = self.group_id.as_deref();

        match (self.target_type, conversation, recipient, group) {
            (MessageKind::Conversation, Some(id), None, None) => {
                Ok(SendTarget::Conversation(parse_id("conversationId", id)?))
            }
            (MessageKind::Conversation, None, Some(id), None) => {
                Ok(SendTarget::Recipient(parse_id("recipientId", id)?))
            }
            (MessageKind::Group, None, None, Some(id)) => Ok(SendTarget::Group(parse_id("groupId", id)?)),
            (_, None, None, None) => Err(DomainError::ValidationError(
                "message must target either a conversation or a group".to_string(),
            )),
            (MessageKind::Conversation, Some(_), Some(_), _) => Err(DomainError::ValidationError(
                "conversationId and recipientId are mutually exclusive".to_string(),
            )),
            _ => Err(DomainError::ValidationError(
                "message cannot target both a conversation and a group".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListMessagesQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl From<ListMessagesQuery> for rolechat_core::MessageQuery {
    fn from(query: ListMessagesQuery) -> Self {
        Self::new(query.page, query.limit)
    }
}

// ============================================================================
// Group Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    #[validate(length(min = 2, max = 50, message = "Group name must be 2-50 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[validate(url(message = "Avatar must be a valid URL"))]
    #[serde(alias = "avatar_url")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    #[serde(alias = "user_id")]
    pub user_id: String,
}

// ============================================================================
// Permission Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChatPermissionRequest {
    #[serde(alias = "can_chat_with")]
    pub can_chat_with: Vec<Role>,

    /// `null` means unlimited
    #[validate(range(min = 1, message = "Daily limit must be positive"))]
    #[serde(alias = "daily_message_limit")]
    pub daily_message_limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRoleSettingRequest {
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GrantCapabilityRequest {
    pub capability: String,
}
