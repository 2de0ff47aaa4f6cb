//! Entity to DTO mappers
//!
//! Implements `From` conversions from domain entities to response DTOs.

use std::collections::HashMap;

use rolechat_core::entities::{GroupMember, PublicProfile, ReadReceipt};
use rolechat_core::{Conversation, Group, Message, QuotaStatus, Snowflake, User};

use super::responses::{
    ConversationResponse, GroupMemberResponse, GroupResponse, MessageResponse, PublicUserResponse,
    QuotaResponse, ReadReceiptResponse, UserResponse,
};

// ============================================================================
// User Mappers
// ============================================================================

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            role: user.role,
            avatar_url: user.avatar_url.clone(),
            is_online: user.is_online,
            last_seen: user.last_seen,
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

impl From<PublicProfile> for PublicUserResponse {
    fn from(profile: PublicProfile) -> Self {
        Self {
            id: profile.id.to_string(),
            name: profile.name,
            role: profile.role,
            avatar_url: profile.avatar_url,
        }
    }
}

impl From<&User> for PublicUserResponse {
    fn from(user: &User) -> Self {
        Self::from(user.profile())
    }
}

impl From<QuotaStatus> for QuotaResponse {
    fn from(status: QuotaStatus) -> Self {
        Self {
            daily_limit: status.limit,
            used_today: status.used,
            remaining: status.remaining(),
            can_send: status.can_send(),
        }
    }
}

// ============================================================================
// Message Mappers
// ============================================================================

impl From<&ReadReceipt> for ReadReceiptResponse {
    fn from(receipt: &ReadReceipt) -> Self {
        Self {
            user_id: receipt.user_id.to_string(),
            read_at: receipt.read_at,
        }
    }
}

/// A message with its sender's public profile attached
#[derive(Debug, Clone)]
pub struct MessageWithSender {
    pub message: Message,
    pub sender: Option<PublicProfile>,
}

impl MessageWithSender {
    pub fn new(message: Message, sender: Option<PublicProfile>) -> Self {
        Self { message, sender }
    }

    /// Attach senders looked up from `users` by id
    pub fn enrich(messages: Vec<Message>, users: &HashMap<Snowflake, User>) -> Vec<Self> {
        messages
            .into_iter()
            .map(|message| {
                let sender = users.get(&message.sender_id).map(User::profile);
                Self::new(message, sender)
            })
            .collect()
    }
}

impl From<MessageWithSender> for MessageResponse {
    fn from(item: MessageWithSender) -> Self {
        let message = item.message;
        Self {
            id: message.id.to_string(),
            sender_id: message.sender_id.to_string(),
            sender: item.sender.map(PublicUserResponse::from),
            message_type: message.kind(),
            conversation_id: message.target.conversation_id().map(|id| id.to_string()),
            group_id: message.target.group_id().map(|id| id.to_string()),
            is_read: message.is_read,
            read_by: message.read_by.iter().map(ReadReceiptResponse::from).collect(),
            created_at: message.created_at,
            content: message.content,
        }
    }
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self::from(MessageWithSender::new(message, None))
    }
}

// ============================================================================
// Conversation Mappers
// ============================================================================

/// A conversation as seen by one of its participants
#[derive(Debug, Clone)]
pub struct ConversationWithDetails {
    pub conversation: Conversation,
    pub other_user: Option<User>,
    pub last_message: Option<MessageWithSender>,
}

impl From<ConversationWithDetails> for ConversationResponse {
    fn from(item: ConversationWithDetails) -> Self {
        let [low, high] = item.conversation.participant_ids();
        Self {
            id: item.conversation.id.to_string(),
            participants: [low.to_string(), high.to_string()],
            other_user: item.other_user.as_ref().map(UserResponse::from),
            last_message: item.last_message.map(MessageResponse::from),
            last_message_at: item.conversation.last_message_at,
            created_at: item.conversation.created_at,
        }
    }
}

impl From<Conversation> for ConversationResponse {
    fn from(conversation: Conversation) -> Self {
        Self::from(ConversationWithDetails {
            conversation,
            other_user: None,
            last_message: None,
        })
    }
}

// ============================================================================
// Group Mappers
// ============================================================================

/// A group with its member list, each member joined to their profile
#[derive(Debug, Clone)]
pub struct GroupWithMembers {
    pub group: Group,
    pub members: Vec<(GroupMember, Option<PublicProfile>)>,
}

impl From<(GroupMember, Option<PublicProfile>)> for GroupMemberResponse {
    fn from((member, profile): (GroupMember, Option<PublicProfile>)) -> Self {
        Self {
            user_id: member.user_id.to_string(),
            role: member.role,
            joined_at: member.joined_at,
            user: profile.map(PublicUserResponse::from),
        }
    }
}

impl From<GroupWithMembers> for GroupResponse {
    fn from(item: GroupWithMembers) -> Self {
        let group = item.group;
        Self {
            id: group.id.to_string(),
            name: group.name,
            description: group.description,
            avatar_url: group.avatar_url,
            created_by: group.created_by.to_string(),
            created_at: group.created_at,
            members: item.members.into_iter().map(GroupMemberResponse::from).collect(),
        }
    }
}

impl From<Group> for GroupResponse {
    fn from(group: Group) -> Self {
        Self::from(GroupWithMembers {
            group,
            members: Vec::new(),
        })
    }
}
