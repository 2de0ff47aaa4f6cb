//! `identify` handler

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage, IdentifyPayload, ReadyPayload};
use crate::server::GatewayState;
use rolechat_common::{AppError, Identity};
use rolechat_core::DomainError;
use rolechat_service::dto::UserResponse;
use rolechat_service::PresenceService;
use std::sync::Arc;

/// Handles `identify` frames
pub struct IdentifyHandler;

impl IdentifyHandler {
    /// Bind the connection to the token's user, mark them online and
    /// answer with `ready`.
    ///
    /// The role comes from the stored user, not the token, so a role
    /// change takes effect on the next identify.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: IdentifyPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        if connection.is_identified() {
            tracing::warn!(
                session_id = %connection.session_id(),
                "Client sent identify while already identified"
            );
            return Err(HandlerError::AlreadyAuthenticated);
        }

        let ctx = state.service_context();
        let claimed = ctx
            .jwt_service()
            .current_user(payload.bare_token())
            .map_err(|e| {
                tracing::debug!(error = %e, "Token validation failed");
                HandlerError::AuthenticationFailed(e)
            })?;

        let user = ctx
            .user_repo()
            .find_by_id(claimed.id)
            .await
            .map_err(|e| HandlerError::Service(e.into()))?
            .ok_or(HandlerError::AuthenticationFailed(AppError::Domain(
                DomainError::UserNotFound(claimed.id),
            )))?;

        let identity = Identity {
            id: user.id,
            role: user.role,
        };
        let session_id = connection.session_id().to_string();
        state
            .connection_manager()
            .authenticate_connection(&session_id, identity);

        if let Some(registry) = state.registry() {
            if let Err(e) = registry.register(user.id, &session_id).await {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to register connection");
            }
        }

        let user = PresenceService::new(ctx).set_online(user.id).await?;

        connection
            .send(GatewayMessage::ready(&ReadyPayload {
                session_id: session_id.clone(),
                user: UserResponse::from(&user),
            }))
            .await
            .map_err(|_| HandlerError::ConnectionClosed)?;

        tracing::info!(
            session_id = %session_id,
            user_id = %user.id,
            role = %user.role,
            "Client identified"
        );

        Ok(None)
    }
}
