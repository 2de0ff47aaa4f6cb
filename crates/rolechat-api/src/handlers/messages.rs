//! Message handlers
//!
//! Sending runs the full pipeline in `MessageService::send`; the caller's
//! token decides the sender and `senderId` in the body must agree with it.

use axum::{extract::State, Json};
use rolechat_service::dto::{MessageResponse, SendMessageRequest};
use rolechat_service::MessageService;

use crate::extractors::{AuthUser, IdPath, ValidatedJson};
use crate::response::{ApiResult, Created, NoContent};
use crate::state::AppState;

/// POST /api/messages
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<SendMessageRequest>,
) -> ApiResult<Created<MessageResponse>> {
    let service = MessageService::new(state.service_context());
    let message = service.send(auth.id, request).await?;
    Ok(Created(message))
}

/// PATCH /api/messages/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(message_id): IdPath,
) -> ApiResult<Json<MessageResponse>> {
    let service = MessageService::new(state.service_context());
    let message = service.mark_read(message_id, auth.id).await?;
    Ok(Json(message))
}

/// DELETE /api/messages/:id
pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(message_id): IdPath,
) -> ApiResult<NoContent> {
    let service = MessageService::new(state.service_context());
    service.delete(auth.id, auth.role, message_id).await?;
    Ok(NoContent)
}
