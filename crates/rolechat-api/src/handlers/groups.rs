//! Group handlers

use axum::{extract::State, Json};
use rolechat_service::dto::{
    parse_id, AddMemberRequest, ApiResponse, CreateGroupRequest, GroupResponse, ListMessagesQuery,
    MessageResponse, PageResponse,
};
use rolechat_service::{GroupService, MessageService};

use crate::extractors::{AuthUser, GroupMemberPath, IdPath, QueryParams, ValidatedJson};
use crate::response::{ApiResult, Created, NoContent};
use crate::state::AppState;

/// GET /api/groups
pub async fn list_groups(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<GroupResponse>>>> {
    let service = GroupService::new(state.service_context());
    let groups = service.list_for_user(auth.id).await?;
    Ok(Json(ApiResponse::new(groups)))
}

/// The creator becomes the group's first admin
///
/// POST /api/groups
pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateGroupRequest>,
) -> ApiResult<Created<GroupResponse>> {
    let service = GroupService::new(state.service_context());
    let group = service.create(auth.id, request).await?;
    Ok(Created(group))
}

/// GET /api/groups/:id
pub async fn get_group(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(group_id): IdPath,
) -> ApiResult<Json<GroupResponse>> {
    let service = GroupService::new(state.service_context());
    let group = service.get(auth.id, auth.role, group_id).await?;
    Ok(Json(group))
}

/// POST /api/groups/:id/members
pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(group_id): IdPath,
    ValidatedJson(request): ValidatedJson<AddMemberRequest>,
) -> ApiResult<Json<GroupResponse>> {
    let user_id = parse_id("userId", &request.user_id)?;
    let service = GroupService::new(state.service_context());
    let group = service.add_member(group_id, auth.id, user_id).await?;
    Ok(Json(group))
}

/// DELETE /api/groups/:id/members/:user_id
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    path: GroupMemberPath,
) -> ApiResult<NoContent> {
    let service = GroupService::new(state.service_context());
    service
        .remove_member(path.group_id, auth.id, path.user_id)
        .await?;
    Ok(NoContent)
}

/// GET /api/groups/:id/messages?page=&limit=
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(group_id): IdPath,
    QueryParams(query): QueryParams<ListMessagesQuery>,
) -> ApiResult<Json<PageResponse<MessageResponse>>> {
    let service = MessageService::new(state.service_context());
    let page = service
        .list_group_messages(auth.id, auth.role, group_id, query)
        .await?;
    Ok(Json(page))
}
