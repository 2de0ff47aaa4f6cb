//! Conversation handlers

use axum::{
    extract::State,
    Json,
};
use rolechat_service::dto::{
    parse_id, ApiResponse, ConversationResponse, CreateConversationRequest, ListMessagesQuery,
    MessageResponse, PageResponse,
};
use rolechat_service::{ConversationService, MessageService};

use crate::extractors::{AuthUser, IdPath, QueryParams, ValidatedJson};
use crate::response::{ApiResult, NoContent};
use crate::state::AppState;

/// Most recently active first
///
/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<ConversationResponse>>>> {
    let service = ConversationService::new(state.service_context());
    let conversations = service.list_for_user(auth.id).await?;
    Ok(Json(ApiResponse::new(conversations)))
}

/// Get or create the conversation with `participantId`
///
/// POST /api/conversations
pub async fn open_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateConversationRequest>,
) -> ApiResult<Json<ConversationResponse>> {
    let participant_id = parse_id("participantId", &request.participant_id)?;
    let service = ConversationService::new(state.service_context());
    let conversation = service.open(auth.id, participant_id).await?;
    Ok(Json(conversation))
}

/// GET /api/conversations/:id
pub async fn get_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(conversation_id): IdPath,
) -> ApiResult<Json<ConversationResponse>> {
    let service = ConversationService::new(state.service_context());
    let conversation = service.get(auth.id, auth.role, conversation_id).await?;
    Ok(Json(conversation))
}

/// DELETE /api/conversations/:id
pub async fn delete_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(conversation_id): IdPath,
) -> ApiResult<NoContent> {
    let service = ConversationService::new(state.service_context());
    service.delete(auth.id, auth.role, conversation_id).await?;
    Ok(NoContent)
}

/// GET /api/conversations/:id/messages?page=&limit=
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(conversation_id): IdPath,
    QueryParams(query): QueryParams<ListMessagesQuery>,
) -> ApiResult<Json<PageResponse<MessageResponse>>> {
    let service = MessageService::new(state.service_context());
    let page = service
        .list_conversation_messages(auth.id, auth.role, conversation_id, query)
        .await?;
    Ok(Json(page))
}
