//! `heartbeat` handler

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage};
use crate::server::GatewayState;
use rolechat_service::PresenceService;
use std::sync::Arc;

/// Handles heartbeat frames
pub struct HeartbeatHandler;

impl HeartbeatHandler {
    /// Acknowledge a heartbeat. For identified connections it also keeps
    /// the user's presence and registry entry fresh; failures there are
    /// logged and the ack still goes out.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
    ) -> HandlerResult<Option<CloseCode>> {
        connection.record_heartbeat();

        tracing::trace!(session_id = %connection.session_id(), "Heartbeat received");

        if let Some(user_id) = connection.user_id() {
            if let Err(e) = PresenceService::new(state.service_context())
                .heartbeat(user_id)
                .await
            {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to refresh presence");
            }
            if let Some(registry) = state.registry() {
                if let Err(e) = registry.refresh(user_id).await {
                    tracing::warn!(user_id = %user_id, error = %e, "Failed to refresh connection registry");
                }
            }
        }

        connection
            .send(GatewayMessage::heartbeat_ack())
            .await
            .map_err(|_| HandlerError::ConnectionClosed)?;

        Ok(None)
    }
}
