//! `typing_start` and `typing_stop` handlers

use super::rooms::RoomHandler;
use super::{identity_of, HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{CloseCode, TypingRoomPayload};
use crate::server::GatewayState;
use rolechat_core::events::TypingPayload;
use rolechat_core::{BroadcastScope, DomainError, EventKind, RealtimeEvent};
use rolechat_service::ServiceError;
use std::sync::Arc;

pub struct TypingHandler;

impl TypingHandler {
    /// Relay a typing indicator to the room the connection joined.
    /// Everyone in the room but the typist receives it.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: TypingRoomPayload,
        started: bool,
    ) -> HandlerResult<Option<CloseCode>> {
        let identity = identity_of(connection)?;
        let scope = payload.scope().map_err(ServiceError::from)?;

        if !connection.is_in(scope) {
            return Err(ServiceError::from(DomainError::MembershipRequired).into());
        }
        // Membership may have ended since the join
        if let Err(e) = RoomHandler::check_access(state, identity, scope).await {
            state
                .connection_manager()
                .leave_room(connection.session_id(), scope);
            return Err(e);
        }

        let ctx = state.service_context();
        let user_name = match ctx.user_repo().find_by_id(identity.id).await {
            Ok(user) => user.map(|u| u.name),
            Err(e) => {
                tracing::debug!(user_id = %identity.id, error = %e, "Typing without a display name");
                None
            }
        };

        let typing = TypingPayload {
            user_id: identity.id,
            user_name,
            conversation_id: match scope {
                BroadcastScope::Conversation(id) => Some(id),
                _ => None,
            },
            group_id: match scope {
                BroadcastScope::Group(id) => Some(id),
                _ => None,
            },
        };
        let kind = if started {
            EventKind::UserTyping
        } else {
            EventKind::UserStoppedTyping
        };
        let event = RealtimeEvent::from_payload(kind, &typing)
            .map_err(|e| HandlerError::InvalidPayload(e.to_string()))?;

        ctx.publish(scope, event).await;
        Ok(None)
    }
}
