//! User handlers

use axum::{
    extract::State,
    Json,
};
use rolechat_service::dto::{
    ApiResponse, CreateUserRequest, ListUsersQuery, QuotaResponse, UpdateOnlineStatusRequest,
    UserResponse,
};
use rolechat_service::UserService;

use crate::extractors::{AuthUser, IdPath, QueryParams, ValidatedJson};
use crate::response::{ApiResult, Created, NoContent};
use crate::state::AppState;

/// GET /api/users?role=
pub async fn list_users(
    State(state): State<AppState>,
    _auth: AuthUser,
    QueryParams(query): QueryParams<ListUsersQuery>,
) -> ApiResult<Json<ApiResponse<Vec<UserResponse>>>> {
    let service = UserService::new(state.service_context());
    let users = service.list(query.role).await?;
    Ok(Json(ApiResponse::new(users)))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> ApiResult<Created<UserResponse>> {
    let service = UserService::new(state.service_context());
    let user = service.create(auth.id, request).await?;
    Ok(Created(user))
}

/// Users the caller's role may message
///
/// GET /api/users/contacts
pub async fn list_contacts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<UserResponse>>>> {
    let service = UserService::new(state.service_context());
    let contacts = service.contacts(auth.id).await?;
    Ok(Json(ApiResponse::new(contacts)))
}

/// GET /api/users/me/quota
pub async fn my_quota(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<QuotaResponse>> {
    let service = UserService::new(state.service_context());
    let quota = service.quota(auth.id).await?;
    Ok(Json(quota))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    IdPath(user_id): IdPath,
) -> ApiResult<Json<UserResponse>> {
    let service = UserService::new(state.service_context());
    let user = service.get(user_id).await?;
    Ok(Json(user))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(user_id): IdPath,
) -> ApiResult<NoContent> {
    let service = UserService::new(state.service_context());
    service.delete(auth.id, auth.role, user_id).await?;
    Ok(NoContent)
}

/// PATCH /api/users/:id/online-status
pub async fn update_online_status(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(user_id): IdPath,
    ValidatedJson(request): ValidatedJson<UpdateOnlineStatusRequest>,
) -> ApiResult<Json<UserResponse>> {
    let service = UserService::new(state.service_context());
    let user = service
        .set_online_status(auth.id, user_id, request.is_online)
        .await?;
    Ok(Json(user))
}
