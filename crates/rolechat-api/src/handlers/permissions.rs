//! Permission administration handlers
//!
//! Reads are open to any authenticated user; every mutation is gated on
//! `modify_user_roles` inside `PermissionService` and answers with the
//! refreshed overview.

use axum::{extract::State, Json};
use rolechat_service::dto::{
    GrantCapabilityRequest, PermissionOverviewResponse, UpdateChatPermissionRequest,
    UpdateRoleSettingRequest,
};
use rolechat_service::PermissionService;

use crate::extractors::{AuthUser, RoleKeyPath, RolePath, ValidatedJson};
use crate::response::{ApiResult, NoContent};
use crate::state::AppState;

/// GET /api/permissions
pub async fn overview(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> ApiResult<Json<PermissionOverviewResponse>> {
    let service = PermissionService::new(state.service_context());
    Ok(Json(service.overview().await?))
}

/// PUT /api/permissions/chat/:role
pub async fn update_chat_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    RolePath(role): RolePath,
    ValidatedJson(request): ValidatedJson<UpdateChatPermissionRequest>,
) -> ApiResult<Json<PermissionOverviewResponse>> {
    let service = PermissionService::new(state.service_context());
    service
        .update_chat_permission(auth.role, role, request)
        .await?;
    Ok(Json(service.overview().await?))
}

/// PUT /api/permissions/settings/:role/:key
pub async fn update_role_setting(
    State(state): State<AppState>,
    auth: AuthUser,
    path: RoleKeyPath,
    ValidatedJson(request): ValidatedJson<UpdateRoleSettingRequest>,
) -> ApiResult<Json<PermissionOverviewResponse>> {
    let service = PermissionService::new(state.service_context());
    service
        .update_role_setting(auth.id, auth.role, path.role, &path.key, request.value)
        .await?;
    Ok(Json(service.overview().await?))
}

/// DELETE /api/permissions/settings/:role/:key
pub async fn delete_role_setting(
    State(state): State<AppState>,
    auth: AuthUser,
    path: RoleKeyPath,
) -> ApiResult<NoContent> {
    let service = PermissionService::new(state.service_context());
    service
        .delete_role_setting(auth.role, path.role, &path.key)
        .await?;
    Ok(NoContent)
}

/// POST /api/permissions/capabilities/:role
pub async fn grant_capability(
    State(state): State<AppState>,
    auth: AuthUser,
    RolePath(role): RolePath,
    ValidatedJson(request): ValidatedJson<GrantCapabilityRequest>,
) -> ApiResult<Json<PermissionOverviewResponse>> {
    let service = PermissionService::new(state.service_context());
    service
        .grant_capability(auth.id, auth.role, role, &request.capability)
        .await?;
    Ok(Json(service.overview().await?))
}

/// DELETE /api/permissions/capabilities/:role/:name
pub async fn revoke_capability(
    State(state): State<AppState>,
    auth: AuthUser,
    path: RoleKeyPath,
) -> ApiResult<NoContent> {
    let service = PermissionService::new(state.service_context());
    service
        .revoke_capability(auth.role, path.role, &path.key)
        .await?;
    Ok(NoContent)
}
