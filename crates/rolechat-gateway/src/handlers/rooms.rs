//! Room join and leave handlers
//!
//! Joining checks that the caller may read the room: participants and
//! members, or holders of `view_all_conversations`. Leaving never fails.

use super::{identity_of, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{CloseCode, ConversationRoomPayload, GroupRoomPayload};
use crate::server::GatewayState;
use rolechat_common::Identity;
use rolechat_core::BroadcastScope;
use rolechat_service::{ConversationService, GroupService};
use std::sync::Arc;

pub struct RoomHandler;

impl RoomHandler {
    pub async fn join_conversation(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: ConversationRoomPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let identity = identity_of(connection)?;
        ConversationService::new(state.service_context())
            .require_viewer(payload.conversation_id, identity.id, identity.role)
            .await?;

        Self::join(state, connection, BroadcastScope::Conversation(payload.conversation_id))
    }

    pub fn leave_conversation(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: ConversationRoomPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        Self::leave(state, connection, BroadcastScope::Conversation(payload.conversation_id))
    }

    pub async fn join_group(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: GroupRoomPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let identity = identity_of(connection)?;
        let groups = GroupService::new(state.service_context());
        groups.find(payload.group_id).await?;
        groups
            .require_viewer(payload.group_id, identity.id, identity.role)
            .await?;

        Self::join(state, connection, BroadcastScope::Group(payload.group_id))
    }

    pub fn leave_group(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: GroupRoomPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        Self::leave(state, connection, BroadcastScope::Group(payload.group_id))
    }

    /// Re-check read access to a room the connection already joined
    pub(super) async fn check_access(
        state: &GatewayState,
        identity: Identity,
        scope: BroadcastScope,
    ) -> HandlerResult<()> {
        let ctx = state.service_context();
        match scope {
            BroadcastScope::Conversation(id) => {
                ConversationService::new(ctx)
                    .require_viewer(id, identity.id, identity.role)
                    .await?;
            }
            BroadcastScope::Group(id) => {
                GroupService::new(ctx)
                    .require_viewer(id, identity.id, identity.role)
                    .await?;
            }
            BroadcastScope::User(_) | BroadcastScope::All => {}
        }
        Ok(())
    }

    fn join(
        state: &GatewayState,
        connection: &Arc<Connection>,
        scope: BroadcastScope,
    ) -> HandlerResult<Option<CloseCode>> {
        state
            .connection_manager()
            .join_room(connection.session_id(), scope);
        tracing::debug!(session_id = %connection.session_id(), room = %scope, "Joined room");
        Ok(None)
    }

    fn leave(
        state: &GatewayState,
        connection: &Arc<Connection>,
        scope: BroadcastScope,
    ) -> HandlerResult<Option<CloseCode>> {
        state
            .connection_manager()
            .leave_room(connection.session_id(), scope);
        tracing::debug!(session_id = %connection.session_id(), room = %scope, "Left room");
        Ok(None)
    }
}
