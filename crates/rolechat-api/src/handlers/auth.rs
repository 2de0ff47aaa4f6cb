//! Authentication handlers
//!
//! Login by user id, logout and token verification.

use axum::{extract::State, Json};
use rolechat_service::dto::{AuthResponse, LoginRequest, VerifyResponse};
use rolechat_service::AuthService;

use crate::extractors::{AuthUser, ValidatedJson};
use crate::response::{ApiResult, NoContent};
use crate::state::AppState;

/// Issue a token and mark the user online
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let service = AuthService::new(state.service_context());
    let response = service.login(request).await?;
    Ok(Json(response))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> ApiResult<NoContent> {
    let service = AuthService::new(state.service_context());
    service.logout(auth.id).await?;
    Ok(NoContent)
}

/// GET /api/auth/verify
pub async fn verify(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<VerifyResponse>> {
    let service = AuthService::new(state.service_context());
    let response = service.verify(auth.identity()).await?;
    Ok(Json(response))
}
