//! Authentication service
//!
//! Session tokens stand in for the external identity provider: a token
//! resolves to `{id, role}` and the rest of the system trusts that pair.

use rolechat_common::{AppError, Identity};
use rolechat_core::{DomainError, Snowflake};
use tracing::{info, instrument};

use crate::dto::{parse_id, AuthResponse, LoginRequest, UserResponse, VerifyResponse};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::presence::PresenceService;

pub struct AuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuthService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Issue a session token for an existing user and mark them online
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<AuthResponse> {
        let user_id = parse_id("userId", &request.user_id)?;
        let user = self
            .ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::UserNotFound(user_id))?;

        let issued = self.ctx.jwt_service().issue(user.id, user.role)?;
        let user = PresenceService::new(self.ctx).set_online(user.id).await?;

        info!(user_id = %user.id, role = %user.role, "User logged in");
        Ok(AuthResponse {
            token: issued.token,
            token_type: issued.token_type,
            expires_in: issued.expires_in,
            user: UserResponse::from(user),
        })
    }

    #[instrument(skip(self))]
    pub async fn logout(&self, user_id: Snowflake) -> ServiceResult<()> {
        PresenceService::new(self.ctx).set_offline(user_id).await?;
        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// Resolve a bearer token to the caller
    pub fn authenticate(&self, token: &str) -> ServiceResult<Identity> {
        Ok(self.ctx.jwt_service().current_user(token)?)
    }

    /// The token's user must still exist with the role it was issued for
    pub async fn verify(&self, identity: Identity) -> ServiceResult<VerifyResponse> {
        let user = self
            .ctx
            .user_repo()
            .find_by_id(identity.id)
            .await?
            .ok_or(AppError::InvalidToken)?;
        if user.role != identity.role {
            return Err(AppError::InvalidToken.into());
        }

        Ok(VerifyResponse {
            valid: true,
            user: UserResponse::from(user),
        })
    }
}
