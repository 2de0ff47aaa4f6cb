//! Conversation service
//!
//! Maps an unordered pair of users onto their single conversation.

use std::collections::HashMap;

use rolechat_core::events::RoomAccessRevokedPayload;
use rolechat_core::{
    BroadcastScope, Capabilities, Conversation, DomainError, EventKind, MessageQuery,
    MessageTarget, ParticipantPair, RealtimeEvent, Role, Snowflake, User,
};
use tracing::{debug, info, instrument, warn};

use crate::dto::{ConversationResponse, ConversationWithDetails, MessageWithSender};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::permission::PermissionService;

pub struct ConversationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ConversationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Idempotent get-or-create for the pair `{a, b}`.
    ///
    /// A concurrent creator that wins the unique index is re-read, so every
    /// caller sees the same row. `last_message_at` is left untouched.
    #[instrument(skip(self))]
    pub async fn get_or_create(&self, a: Snowflake, b: Snowflake) -> ServiceResult<Conversation> {
        self.find_or_create(a, b).await.map(|(conversation, _)| conversation)
    }

    /// Like [`Self::get_or_create`]; the flag is set when this call inserted it
    pub(crate) async fn find_or_create(
        &self,
        a: Snowflake,
        b: Snowflake,
    ) -> ServiceResult<(Conversation, bool)> {
        let pair = ParticipantPair::new(a, b)?;
        let repo = self.ctx.conversation_repo();

        if let Some(existing) = repo.find_by_pair(&pair).await? {
            return Ok((existing, false));
        }

        let conversation = Conversation::new(self.ctx.generate_id(), pair, self.ctx.clock().now());
        match repo.create(&conversation).await {
            Ok(()) => {
                info!(conversation_id = %conversation.id, "Conversation created");
                Ok((conversation, true))
            }
            Err(DomainError::ConversationConflict) => {
                debug!("Lost conversation creation race, re-reading");
                let existing = repo.find_by_pair(&pair).await?.ok_or_else(|| {
                    DomainError::InternalError("conversation vanished after conflict".into())
                })?;
                Ok((existing, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Open (or reuse) a conversation between the caller and `participant_id`,
    /// subject to the permission rules
    #[instrument(skip(self))]
    pub async fn open(
        &self,
        caller_id: Snowflake,
        participant_id: Snowflake,
    ) -> ServiceResult<ConversationResponse> {
        if caller_id == participant_id {
            return Err(DomainError::SelfConversation.into());
        }
        let caller = self.load_user(caller_id).await?;
        let other = self.load_user(participant_id).await?;

        PermissionService::new(self.ctx)
            .require_communicate(caller.role, other.role)
            .await?;

        let conversation = self.get_or_create(caller.id, other.id).await?;
        let last_message = self.last_message(conversation.id).await?;

        Ok(ConversationResponse::from(ConversationWithDetails {
            conversation,
            other_user: Some(other),
            last_message,
        }))
    }

    /// The user's conversations, most recently active first
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: Snowflake) -> ServiceResult<Vec<ConversationResponse>> {
        let conversations = self.ctx.conversation_repo().list_for_user(user_id).await?;

        let others: Vec<Snowflake> = conversations
            .iter()
            .filter_map(|c| c.other_participant(user_id))
            .collect();
        let users: HashMap<Snowflake, User> = self
            .ctx
            .user_repo()
            .find_many(&others)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut responses = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let other_user = conversation
                .other_participant(user_id)
                .and_then(|id| users.get(&id).cloned());
            let last_message = self.last_message(conversation.id).await?;
            responses.push(ConversationResponse::from(ConversationWithDetails {
                conversation,
                other_user,
                last_message,
            }));
        }

        Ok(responses)
    }

    /// Participants, or holders of `view_all_conversations`
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        viewer_id: Snowflake,
        viewer_role: Role,
        conversation_id: Snowflake,
    ) -> ServiceResult<ConversationResponse> {
        let conversation = self.find(conversation_id).await?;
        if !conversation.has_participant(viewer_id) {
            self.require_oversight(viewer_role).await?;
        }

        let counterpart = conversation
            .other_participant(viewer_id)
            .unwrap_or_else(|| conversation.participants.high());
        let other_user = self.ctx.user_repo().find_by_id(counterpart).await?;
        let last_message = self.last_message(conversation.id).await?;

        Ok(ConversationResponse::from(ConversationWithDetails {
            conversation,
            other_user,
            last_message,
        }))
    }

    /// Deletes the conversation and its messages. Participants may delete
    /// their own conversations; moderators may delete any.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        actor_id: Snowflake,
        actor_role: Role,
        conversation_id: Snowflake,
    ) -> ServiceResult<()> {
        let conversation = self.find(conversation_id).await?;
        if !conversation.has_participant(actor_id) {
            PermissionService::new(self.ctx)
                .require_action(actor_role, Capabilities::DELETE_MESSAGES)
                .await?;
        }

        self.ctx.conversation_repo().delete(conversation.id).await?;
        info!(conversation_id = %conversation.id, actor_id = %actor_id, "Conversation deleted");

        // Everyone in the room loses it
        let revoked = RoomAccessRevokedPayload {
            user_id: None,
            conversation_id: Some(conversation.id),
            group_id: None,
        };
        match RealtimeEvent::from_payload(EventKind::RoomAccessRevoked, &revoked) {
            Ok(event) => {
                self.ctx
                    .publish(BroadcastScope::Conversation(conversation.id), event)
                    .await;
            }
            Err(e) => warn!(conversation_id = %conversation.id, error = %e, "Failed to encode revocation"),
        }
        Ok(())
    }

    /// The conversation, if `user_id` takes part in it
    pub async fn require_participant(
        &self,
        conversation_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<Conversation> {
        let conversation = self.find(conversation_id).await?;
        if conversation.has_participant(user_id) {
            Ok(conversation)
        } else {
            Err(DomainError::MembershipRequired.into())
        }
    }

    /// Participants, or holders of `view_all_conversations`
    pub async fn require_viewer(
        &self,
        conversation_id: Snowflake,
        viewer_id: Snowflake,
        viewer_role: Role,
    ) -> ServiceResult<Conversation> {
        let conversation = self.find(conversation_id).await?;
        if !conversation.has_participant(viewer_id) {
            self.require_oversight(viewer_role).await?;
        }
        Ok(conversation)
    }

    async fn require_oversight(&self, role: Role) -> ServiceResult<()> {
        let allowed = PermissionService::new(self.ctx)
            .can_perform(role, Capabilities::VIEW_ALL_CONVERSATIONS)
            .await?;
        if allowed {
            Ok(())
        } else {
            Err(DomainError::MembershipRequired.into())
        }
    }

    async fn find(&self, conversation_id: Snowflake) -> ServiceResult<Conversation> {
        self.ctx
            .conversation_repo()
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| DomainError::ConversationNotFound(conversation_id).into())
    }

    async fn load_user(&self, user_id: Snowflake) -> ServiceResult<User> {
        self.ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(user_id).into())
    }

    async fn last_message(&self, conversation_id: Snowflake) -> ServiceResult<Option<MessageWithSender>> {
        let newest = self
            .ctx
            .message_repo()
            .list(MessageTarget::Conversation(conversation_id), MessageQuery::new(Some(1), Some(1)))
            .await?
            .pop();

        let Some(message) = newest else {
            return Ok(None);
        };
        let sender = self
            .ctx
            .user_repo()
            .find_by_id(message.sender_id)
            .await?
            .map(|u| u.profile());
        Ok(Some(MessageWithSender::new(message, sender)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;

    #[tokio::test]
    async fn test_get_or_create_is_unordered() {
        let harness = TestHarness::new();
        let sarah = harness.user("Sarah", Role::Teacher).await;
        let alice = harness.user("Alice", Role::Student).await;
        let service = ConversationService::new(&harness.ctx);

        let first = service.get_or_create(sarah.id, alice.id).await.unwrap();
        let second = service.get_or_create(alice.id, sarah.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.last_message_at, second.last_message_at);
    }

    #[tokio::test]
    async fn test_concurrent_creation_converges() {
        let harness = TestHarness::new();
        let sarah = harness.user("Sarah", Role::Teacher).await;
        let alice = harness.user("Alice", Role::Student).await;

        let ctx = harness.ctx.clone();
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let ctx = ctx.clone();
                let (a, b) = if i % 2 == 0 { (sarah.id, alice.id) } else { (alice.id, sarah.id) };
                tokio::spawn(async move { ConversationService::new(&ctx).get_or_create(a, b).await })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(harness.conversation_count(), 1);
    }

    #[tokio::test]
    async fn test_self_conversation_rejected() {
        let harness = TestHarness::new();
        let root = harness.user("Root", Role::SuperAdmin).await;
        let err = ConversationService::new(&harness.ctx)
            .open(root.id, root.id)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::SelfConversation)));
    }

    #[tokio::test]
    async fn test_open_checks_permissions() {
        let harness = TestHarness::new();
        let alice = harness.user("Alice", Role::Student).await;
        let bob = harness.user("Bob", Role::Student).await;

        let err = ConversationService::new(&harness.ctx)
            .open(alice.id, bob.id)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "PERMISSION_DENIED");
        assert_eq!(harness.conversation_count(), 0);
    }

    #[tokio::test]
    async fn test_get_restricted_to_participants() {
        let harness = TestHarness::new();
        let sarah = harness.user("Sarah", Role::Teacher).await;
        let alice = harness.user("Alice", Role::Student).await;
        let tom = harness.user("Tom", Role::Teacher).await;
        let admin = harness.user("Ada", Role::Admin).await;
        let service = ConversationService::new(&harness.ctx);

        let conversation = service.open(sarah.id, alice.id).await.unwrap();
        let id = Snowflake::parse(&conversation.id).unwrap();

        assert!(service.get(alice.id, alice.role, id).await.is_ok());
        let err = service.get(tom.id, tom.role, id).await.unwrap_err();
        assert_eq!(err.error_code(), "MEMBERSHIP_REQUIRED");
        assert!(service.get(admin.id, admin.role, id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_cascades_messages() {
        let harness = TestHarness::new();
        let sarah = harness.user("Sarah", Role::Teacher).await;
        let alice = harness.user("Alice", Role::Student).await;
        let sent = harness.send_direct(&sarah, &alice, "hello").await.unwrap();
        let conversation_id = Snowflake::parse(sent.conversation_id.as_deref().unwrap()).unwrap();

        ConversationService::new(&harness.ctx)
            .delete(alice.id, alice.role, conversation_id)
            .await
            .unwrap();

        assert_eq!(harness.conversation_count(), 0);
        assert_eq!(harness.message_count(), 0);

        let revoked = harness.broadcaster.events_named("room_access_revoked");
        assert_eq!(revoked.len(), 1);
        assert_eq!(revoked[0].0, BroadcastScope::Conversation(conversation_id));
        assert!(revoked[0].1.data.get("userId").is_none());
    }
}
