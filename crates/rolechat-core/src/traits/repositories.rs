//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    ChatPermission, Conversation, Group, GroupMember, Message, MessageTarget, ParticipantPair,
    RoleCapability, RoleSetting, User,
};
use crate::error::DomainError;
use crate::value_objects::{Capabilities, Role, Snowflake};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<User>>;

    /// Find every user in `ids` that exists
    async fn find_many(&self, ids: &[Snowflake]) -> RepoResult<Vec<User>>;

    /// List users, optionally restricted to one role, ordered by name
    async fn list(&self, role: Option<Role>) -> RepoResult<Vec<User>>;

    /// Create a new user
    async fn create(&self, user: &User) -> RepoResult<()>;

    /// Update name, role and avatar
    async fn update(&self, user: &User) -> RepoResult<()>;

    async fn delete(&self, id: Snowflake) -> RepoResult<()>;

    /// Set the presence flag and advance `last_seen` (never backwards).
    ///
    /// Returns the updated user, or `None` when the user does not exist.
    async fn set_presence(
        &self,
        id: Snowflake,
        online: bool,
        at: DateTime<Utc>,
    ) -> RepoResult<Option<User>>;

    /// Online users whose `last_seen` is older than `cutoff`
    async fn find_stale_online(&self, cutoff: DateTime<Utc>) -> RepoResult<Vec<User>>;
}

// ============================================================================
// Conversation Repository
// ============================================================================

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Conversation>>;

    /// Find the conversation for an unordered participant pair
    async fn find_by_pair(&self, pair: &ParticipantPair) -> RepoResult<Option<Conversation>>;

    /// Insert a new conversation.
    ///
    /// Fails with [`DomainError::ConversationConflict`] when one already exists
    /// for the same pair.
    async fn create(&self, conversation: &Conversation) -> RepoResult<()>;

    /// Conversations a user participates in, most recently active first
    async fn list_for_user(&self, user_id: Snowflake) -> RepoResult<Vec<Conversation>>;

    /// Delete a conversation and its messages
    async fn delete(&self, id: Snowflake) -> RepoResult<()>;

    /// Delete a conversation only while it holds no messages.
    /// `false` when it has messages or is already gone.
    async fn delete_if_empty(&self, id: Snowflake) -> RepoResult<bool>;
}

// ============================================================================
// Group Repository
// ============================================================================

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Group>>;

    /// Groups a user belongs to
    async fn list_for_user(&self, user_id: Snowflake) -> RepoResult<Vec<Group>>;

    /// Create a group together with its creator's membership
    async fn create(&self, group: &Group, owner: &GroupMember) -> RepoResult<()>;

    async fn update(&self, group: &Group) -> RepoResult<()>;

    /// Delete a group, its memberships and its messages
    async fn delete(&self, id: Snowflake) -> RepoResult<()>;

    async fn members(&self, group_id: Snowflake) -> RepoResult<Vec<GroupMember>>;

    async fn find_member(
        &self,
        group_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<GroupMember>>;

    /// Fails with [`DomainError::AlreadyMember`] on a duplicate
    async fn add_member(&self, member: &GroupMember) -> RepoResult<()>;

    async fn remove_member(&self, group_id: Snowflake, user_id: Snowflake) -> RepoResult<()>;
}

// ============================================================================
// Message Repository
// ============================================================================

/// Page-based pagination for message listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageQuery {
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
}

impl MessageQuery {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for MessageQuery {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find message by ID, read receipts included
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>>;

    /// Persist `message` only if its sender has sent fewer than `limit`
    /// messages since `window_start`.
    ///
    /// The count and the insert happen atomically with respect to other sends
    /// by the same sender. Conversation messages also advance the
    /// conversation's `last_message_at`. `None` means unlimited.
    async fn create_within_quota(
        &self,
        message: &Message,
        limit: Option<u32>,
        window_start: DateTime<Utc>,
    ) -> RepoResult<()>;

    /// Messages authored by `sender_id` at or after `since`
    async fn count_since(&self, sender_id: Snowflake, since: DateTime<Utc>) -> RepoResult<u32>;

    /// One page of a target's messages, newest page first, each page in
    /// chronological order
    async fn list(&self, target: MessageTarget, query: MessageQuery) -> RepoResult<Vec<Message>>;

    /// Record that `reader` read the message (idempotent) and recompute
    /// `is_read`. Returns the updated message, or `None` if it does not exist.
    async fn mark_read(
        &self,
        message_id: Snowflake,
        reader: Snowflake,
        at: DateTime<Utc>,
    ) -> RepoResult<Option<Message>>;

    async fn delete(&self, id: Snowflake) -> RepoResult<()>;
}

// ============================================================================
// Permission Repository
// ============================================================================

#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Every static `chat_permissions` row
    async fn chat_permissions(&self) -> RepoResult<Vec<ChatPermission>>;

    async fn upsert_chat_permission(&self, permission: &ChatPermission) -> RepoResult<()>;

    async fn role_settings(&self) -> RepoResult<Vec<RoleSetting>>;

    async fn upsert_role_setting(&self, setting: &RoleSetting) -> RepoResult<()>;

    async fn delete_role_setting(&self, role: Role, key: &str) -> RepoResult<()>;

    async fn role_capabilities(&self) -> RepoResult<Vec<RoleCapability>>;

    /// Grant a capability; granting twice is a no-op
    async fn grant_capability(&self, grant: &RoleCapability) -> RepoResult<()>;

    async fn revoke_capability(&self, role: Role, capability: Capabilities) -> RepoResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_query_defaults() {
        let query = MessageQuery::default();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 50);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_message_query_clamps() {
        let query = MessageQuery::new(Some(0), Some(10_000));
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, MessageQuery::MAX_LIMIT);

        let query = MessageQuery::new(Some(3), Some(20));
        assert_eq!(query.offset(), 40);
    }
}
