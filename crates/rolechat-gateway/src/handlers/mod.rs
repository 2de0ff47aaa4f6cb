//! Op handlers
//!
//! Handles incoming frames based on their op.

mod error;
mod heartbeat;
mod identify;
mod rooms;
mod send;
mod typing;

pub use error::{service_response, HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use identify::IdentifyHandler;
pub use rooms::RoomHandler;
pub use send::SendMessageHandler;
pub use typing::TypingHandler;

use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage, OpCode};
use crate::server::GatewayState;
use rolechat_common::Identity;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Decode a frame's `d` as the op's payload
fn decode<T: DeserializeOwned>(message: &GatewayMessage) -> HandlerResult<T> {
    message
        .payload()
        .map_err(|e| HandlerError::InvalidPayload(format!("{}: {e}", message.op)))
}

/// The caller bound by `identify`
fn identity_of(connection: &Connection) -> HandlerResult<Identity> {
    connection.identity().ok_or(HandlerError::NotAuthenticated)
}

/// Dispatch incoming client frames to their handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle one client frame.
    ///
    /// `Ok(Some(code))` asks the caller to close the socket with `code`.
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: GatewayMessage,
    ) -> HandlerResult<Option<CloseCode>> {
        if !message.op.is_client_op() {
            tracing::warn!(
                session_id = %connection.session_id(),
                op = %message.op,
                "Received server-only op from client"
            );
            return Ok(Some(CloseCode::UnknownOpcode));
        }

        if !message.op.allowed_before_identify() && !connection.is_identified() {
            return Err(HandlerError::NotAuthenticated);
        }

        match message.op {
            OpCode::Identify => IdentifyHandler::handle(state, connection, decode(&message)?).await,
            OpCode::Heartbeat => HeartbeatHandler::handle(state, connection).await,
            OpCode::JoinConversation => {
                RoomHandler::join_conversation(state, connection, decode(&message)?).await
            }
            OpCode::LeaveConversation => {
                RoomHandler::leave_conversation(state, connection, decode(&message)?)
            }
            OpCode::JoinGroup => RoomHandler::join_group(state, connection, decode(&message)?).await,
            OpCode::LeaveGroup => RoomHandler::leave_group(state, connection, decode(&message)?),
            OpCode::TypingStart => {
                TypingHandler::handle(state, connection, decode(&message)?, true).await
            }
            OpCode::TypingStop => {
                TypingHandler::handle(state, connection, decode(&message)?, false).await
            }
            OpCode::SendMessage => {
                SendMessageHandler::handle(state, connection, decode(&message)?).await
            }
            // Server ops were rejected above
            _ => Ok(Some(CloseCode::UnknownOpcode)),
        }
    }
}
