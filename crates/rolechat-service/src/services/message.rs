//! Message service
//!
//! The send pipeline runs strictly in order: validate, authorize, check the
//! quota, resolve the target, persist, then fan out. Nothing is persisted
//! unless every earlier stage passed, and a failed fan-out never undoes the
//! persisted message. A conversation created for a send that then fails is
//! removed again while it is still empty.

use std::collections::HashMap;

use rolechat_core::entities::normalize_content;
use rolechat_core::events::MessageReadPayload;
use rolechat_core::{
    BroadcastScope, Capabilities, DomainError, EventKind, Message, MessageQuery, MessageTarget,
    RealtimeEvent, Role, Snowflake, User,
};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::dto::{
    ListMessagesQuery, MessageResponse, MessageWithSender, PageResponse, SendMessageRequest,
    SendTarget,
};

use super::context::ServiceContext;
use super::conversation::ConversationService;
use super::error::ServiceResult;
use super::group::GroupService;
use super::permission::PermissionService;
use super::presence::PresenceService;
use super::quota::QuotaService;

/// Target after authorization, before the conversation is materialized
enum Route {
    Conversation(Snowflake),
    Direct(Snowflake),
    Group(Snowflake),
}

pub struct MessageService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Send a message as `sender_id`
    #[instrument(skip(self, request), fields(target = ?request.target_type))]
    pub async fn send(
        &self,
        sender_id: Snowflake,
        request: SendMessageRequest,
    ) -> ServiceResult<MessageResponse> {
        // 1. Validate
        request.validate()?;
        if let Some(claimed) = request.sender_id.as_deref() {
            if claimed.trim() != sender_id.to_string() {
                return Err(DomainError::ValidationError(
                    "senderId does not match the authenticated user".to_string(),
                )
                .into());
            }
        }
        let content = normalize_content(&request.content, self.ctx.settings().max_content_length)?;
        let target = request.target()?;

        // 2. Authorize
        let sender = self.load_user(sender_id).await?;
        let route = self.authorize(&sender, target).await?;

        // 3. Quota
        let quota = QuotaService::new(self.ctx);
        let status = quota.status_for(sender.id, sender.role).await?;
        if !status.can_send() {
            return Err(DomainError::QuotaExceeded {
                limit: status.limit.unwrap_or(0),
            }
            .into());
        }

        // 4. Resolve target
        let mut created = None;
        let target = match route {
            Route::Conversation(id) => MessageTarget::Conversation(id),
            Route::Direct(recipient_id) => {
                let (conversation, fresh) = ConversationService::new(self.ctx)
                    .find_or_create(sender.id, recipient_id)
                    .await?;
                if fresh {
                    created = Some(conversation.id);
                }
                MessageTarget::Conversation(conversation.id)
            }
            Route::Group(id) => {
                GroupService::new(self.ctx).require_member(id, sender.id).await?;
                MessageTarget::Group(id)
            }
        };

        // 5. Persist; the repository re-checks the limit atomically
        let message = Message::new(
            self.ctx.generate_id(),
            sender.id,
            content,
            target,
            self.ctx.clock().now(),
        );
        if let Err(e) = self
            .ctx
            .message_repo()
            .create_within_quota(&message, status.limit, quota.window_start())
            .await
        {
            if let Some(id) = created {
                self.discard_empty_conversation(id).await;
            }
            return Err(e.into());
        }

        info!(
            message_id = %message.id,
            sender_id = %sender.id,
            target = ?message.target,
            "Message sent"
        );

        // Sending counts as activity
        if let Err(e) = PresenceService::new(self.ctx).heartbeat(sender.id).await {
            warn!(sender_id = %sender.id, error = %e, "Failed to refresh sender presence");
        }

        // 6. Fan out
        let response = MessageResponse::from(MessageWithSender::new(message, Some(sender.profile())));
        self.publish_new_message(target, &response).await;

        Ok(response)
    }

    /// Record that `reader_id` read the message. Idempotent; only the first
    /// read by a user is announced.
    #[instrument(skip(self))]
    pub async fn mark_read(
        &self,
        message_id: Snowflake,
        reader_id: Snowflake,
    ) -> ServiceResult<MessageResponse> {
        let message = self.find(message_id).await?;
        match message.target {
            MessageTarget::Conversation(id) => {
                ConversationService::new(self.ctx)
                    .require_participant(id, reader_id)
                    .await?;
            }
            MessageTarget::Group(id) => {
                GroupService::new(self.ctx).require_member(id, reader_id).await?;
            }
        }

        if message.has_read(reader_id) {
            return self.with_sender(message).await;
        }

        let updated = self
            .ctx
            .message_repo()
            .mark_read(message_id, reader_id, self.ctx.clock().now())
            .await?
            .ok_or(DomainError::MessageNotFound(message_id))?;

        if let Some(receipt) = updated.read_by.iter().find(|r| r.user_id == reader_id) {
            let payload = MessageReadPayload {
                message_id: updated.id,
                read_by: reader_id,
                read_at: receipt.read_at,
                is_read: updated.is_read,
            };
            match RealtimeEvent::from_payload(EventKind::MessageRead, &payload) {
                Ok(event) => self.ctx.publish(scope_for(updated.target), event).await,
                Err(e) => warn!(message_id = %updated.id, error = %e, "Failed to encode read event"),
            }
        }

        info!(message_id = %message_id, reader_id = %reader_id, is_read = updated.is_read, "Message read");
        self.with_sender(updated).await
    }

    /// One page of a conversation, oldest first within the page
    #[instrument(skip(self))]
    pub async fn list_conversation_messages(
        &self,
        viewer_id: Snowflake,
        viewer_role: Role,
        conversation_id: Snowflake,
        query: ListMessagesQuery,
    ) -> ServiceResult<PageResponse<MessageResponse>> {
        ConversationService::new(self.ctx)
            .require_viewer(conversation_id, viewer_id, viewer_role)
            .await?;
        self.list(MessageTarget::Conversation(conversation_id), query.into())
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_group_messages(
        &self,
        viewer_id: Snowflake,
        viewer_role: Role,
        group_id: Snowflake,
        query: ListMessagesQuery,
    ) -> ServiceResult<PageResponse<MessageResponse>> {
        let groups = GroupService::new(self.ctx);
        groups.find(group_id).await?;
        groups.require_viewer(group_id, viewer_id, viewer_role).await?;
        self.list(MessageTarget::Group(group_id), query.into()).await
    }

    /// The sender, or a holder of `delete_messages`
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        actor_id: Snowflake,
        actor_role: Role,
        message_id: Snowflake,
    ) -> ServiceResult<()> {
        let message = self.find(message_id).await?;
        if message.sender_id != actor_id {
            PermissionService::new(self.ctx)
                .require_action(actor_role, Capabilities::DELETE_MESSAGES)
                .await?;
        }

        self.ctx.message_repo().delete(message.id).await?;
        info!(message_id = %message.id, actor_id = %actor_id, "Message deleted");
        Ok(())
    }

    /// Stage 2: pairwise role check for direct messages. Group sends have
    /// no single recipient role; membership gates them in stage 4.
    async fn authorize(&self, sender: &User, target: SendTarget) -> ServiceResult<Route> {
        let permissions = PermissionService::new(self.ctx);
        match target {
            SendTarget::Conversation(id) => {
                let conversation = ConversationService::new(self.ctx)
                    .require_participant(id, sender.id)
                    .await?;
                let recipient_id = conversation
                    .other_participant(sender.id)
                    .ok_or(DomainError::MembershipRequired)?;
                let recipient = self.load_user(recipient_id).await?;
                permissions.require_communicate(sender.role, recipient.role).await?;
                Ok(Route::Conversation(id))
            }
            SendTarget::Recipient(id) => {
                if id == sender.id {
                    return Err(DomainError::SelfConversation.into());
                }
                let recipient = self.load_user(id).await?;
                permissions.require_communicate(sender.role, recipient.role).await?;
                Ok(Route::Direct(id))
            }
            SendTarget::Group(id) => {
                GroupService::new(self.ctx).find(id).await?;
                Ok(Route::Group(id))
            }
        }
    }

    async fn list(
        &self,
        target: MessageTarget,
        query: MessageQuery,
    ) -> ServiceResult<PageResponse<MessageResponse>> {
        let messages = self.ctx.message_repo().list(target, query).await?;

        let mut sender_ids: Vec<Snowflake> = messages.iter().map(|m| m.sender_id).collect();
        sender_ids.sort_unstable();
        sender_ids.dedup();
        let users: HashMap<Snowflake, User> = self
            .ctx
            .user_repo()
            .find_many(&sender_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let data = MessageWithSender::enrich(messages, &users)
            .into_iter()
            .map(MessageResponse::from)
            .collect();
        Ok(PageResponse::new(data, query.page, query.limit))
    }

    async fn publish_new_message(&self, target: MessageTarget, response: &MessageResponse) {
        match RealtimeEvent::from_payload(EventKind::NewMessage, response) {
            Ok(event) => self.ctx.publish(scope_for(target), event).await,
            Err(e) => warn!(message_id = %response.id, error = %e, "Failed to encode message event"),
        }
    }

    async fn with_sender(&self, message: Message) -> ServiceResult<MessageResponse> {
        let sender = self
            .ctx
            .user_repo()
            .find_by_id(message.sender_id)
            .await?
            .map(|u| u.profile());
        Ok(MessageResponse::from(MessageWithSender::new(message, sender)))
    }

    /// Undo a conversation created for a send that failed to persist.
    /// A concurrent send that already landed in it keeps it alive.
    async fn discard_empty_conversation(&self, id: Snowflake) {
        match self.ctx.conversation_repo().delete_if_empty(id).await {
            Ok(true) => debug!(conversation_id = %id, "Discarded conversation of a failed send"),
            Ok(false) => {}
            Err(e) => warn!(conversation_id = %id, error = %e, "Failed to discard empty conversation"),
        }
    }

    async fn find(&self, message_id: Snowflake) -> ServiceResult<Message> {
        self.ctx
            .message_repo()
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| DomainError::MessageNotFound(message_id).into())
    }

    async fn load_user(&self, user_id: Snowflake) -> ServiceResult<User> {
        self.ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(user_id).into())
    }
}

/// Room that receives a message's events
pub fn scope_for(target: MessageTarget) -> BroadcastScope {
    match target {
        MessageTarget::Conversation(id) => BroadcastScope::Conversation(id),
        MessageTarget::Group(id) => BroadcastScope::Group(id),
    }
}
