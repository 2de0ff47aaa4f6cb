//! `send_message` handler

use super::{identity_of, service_response, HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{
    CloseCode, GatewayMessage, MessageErrorPayload, MessageSentPayload, SendMessagePayload,
};
use crate::server::GatewayState;
use rolechat_service::MessageService;
use std::sync::Arc;

pub struct SendMessageHandler;

impl SendMessageHandler {
    /// Run the message pipeline for the identified caller.
    ///
    /// The outcome goes back to the sender only, as `message_sent` or
    /// `message_error`; everyone else sees the `new_message` the pipeline
    /// publishes. A `senderId` naming anyone else is rejected.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: SendMessagePayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let identity = identity_of(connection)?;
        let SendMessagePayload { request, temp_id } = payload;

        let reply = match MessageService::new(state.service_context())
            .send(identity.id, request)
            .await
        {
            Ok(message) => GatewayMessage::message_sent(&MessageSentPayload {
                message_id: message.id,
                temp_id,
            }),
            Err(e) => {
                tracing::debug!(user_id = %identity.id, error = %e, "Message rejected");
                GatewayMessage::message_error(&MessageErrorPayload {
                    temp_id,
                    error: service_response(e),
                })
            }
        };

        connection
            .send(reply)
            .await
            .map_err(|_| HandlerError::ConnectionClosed)?;
        Ok(None)
    }
}
