//! Test fixtures
//!
//! Request bodies as clients send them (camelCase) and the parts of the
//! responses the scenarios read (snake_case).

use rolechat_core::{Role, Snowflake, User};
use serde::{Deserialize, Serialize};

/// Login request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_id: String,
}

impl LoginRequest {
    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id.to_string(),
        }
    }
}

/// Send message request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
    pub target_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl SendMessageRequest {
    /// Direct message; the conversation is created on first send
    pub fn to_user(content: &str, recipient: &User) -> Self {
        Self {
            content: content.to_string(),
            target_type: "conversation",
            conversation_id: None,
            recipient_id: Some(recipient.id.to_string()),
            group_id: None,
        }
    }

    pub fn to_conversation(content: &str, conversation_id: &str) -> Self {
        Self {
            content: content.to_string(),
            target_type: "conversation",
            conversation_id: Some(conversation_id.to_string()),
            recipient_id: None,
            group_id: None,
        }
    }

    pub fn to_group(content: &str, group_id: &str) -> Self {
        Self {
            content: content.to_string(),
            target_type: "group",
            conversation_id: None,
            recipient_id: None,
            group_id: Some(group_id.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenConversationRequest {
    pub participant_id: String,
}

impl OpenConversationRequest {
    pub fn with(user: &User) -> Self {
        Self {
            participant_id: user.id.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateGroupRequest {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChatPermissionRequest {
    pub can_chat_with: Vec<Role>,
    pub daily_message_limit: Option<u32>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub is_online: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReadReceipt {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub sender_id: String,
    pub content: String,
    pub conversation_id: Option<String>,
    pub group_id: Option<String>,
    pub is_read: bool,
    pub read_by: Vec<ReadReceipt>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationResponse {
    pub id: String,
    pub participants: [String; 2],
    pub other_user: Option<UserResponse>,
}

#[derive(Debug, Deserialize)]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct QuotaResponse {
    pub daily_limit: Option<u32>,
    pub used_today: u32,
    pub remaining: Option<u32>,
    pub can_send: bool,
}

/// `{"data": [...]}` list envelope
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
}

/// Snowflake of a response id
pub fn id_of(raw: &str) -> Snowflake {
    Snowflake::parse(raw).expect("response ids are snowflakes")
}
