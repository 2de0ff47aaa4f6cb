//! User service
//!
//! Role-gated account management and contact discovery.

use rolechat_core::{Capabilities, DomainError, Role, Snowflake, User};
use tracing::{info, instrument};
use validator::Validate;

use crate::dto::{CreateUserRequest, QuotaResponse, UserResponse};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::permission::PermissionService;
use super::presence::PresenceService;
use super::quota::QuotaService;

pub struct UserService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> UserService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create an account of `request.role`, if the creator's role may
    #[instrument(skip(self, request), fields(role = %request.role))]
    pub async fn create(
        &self,
        creator_id: Snowflake,
        request: CreateUserRequest,
    ) -> ServiceResult<UserResponse> {
        request.validate()?;
        let creator = self.load(creator_id).await?;

        let allowed = PermissionService::new(self.ctx)
            .creatable_roles(creator.role)
            .await?;
        if !allowed.contains(&request.role) {
            return Err(DomainError::MissingPermission(format!(
                "a {} cannot create {} accounts",
                creator.role.label(),
                request.role.label()
            ))
            .into());
        }

        let user = User::new(
            self.ctx.generate_id(),
            request.name.trim().to_string(),
            request.role,
            self.ctx.clock().now(),
        )
        .with_avatar(request.avatar_url);
        self.ctx.user_repo().create(&user).await?;

        info!(user_id = %user.id, role = %user.role, creator_id = %creator.id, "User created");
        Ok(UserResponse::from(user))
    }

    pub async fn get(&self, user_id: Snowflake) -> ServiceResult<UserResponse> {
        Ok(UserResponse::from(self.load(user_id).await?))
    }

    pub async fn list(&self, role: Option<Role>) -> ServiceResult<Vec<UserResponse>> {
        let users = self.ctx.user_repo().list(role).await?;
        Ok(users.iter().map(UserResponse::from).collect())
    }

    /// Every other user the viewer's role may message
    #[instrument(skip(self))]
    pub async fn contacts(&self, viewer_id: Snowflake) -> ServiceResult<Vec<UserResponse>> {
        let viewer = self.load(viewer_id).await?;
        let reachable = PermissionService::new(self.ctx)
            .reachable_roles(viewer.role)
            .await?;

        let users = self.ctx.user_repo().list(None).await?;
        Ok(users
            .iter()
            .filter(|u| u.id != viewer.id && reachable.contains(&u.role))
            .map(UserResponse::from)
            .collect())
    }

    /// Requires `manage_lower_roles` and a strictly lower target role
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        actor_id: Snowflake,
        actor_role: Role,
        user_id: Snowflake,
    ) -> ServiceResult<()> {
        PermissionService::new(self.ctx)
            .require_action(actor_role, Capabilities::MANAGE_LOWER_ROLES)
            .await?;

        let target = self.load(user_id).await?;
        if target.id == actor_id || !actor_role.outranks(target.role) {
            return Err(DomainError::MissingPermission(format!(
                "a {} cannot delete a {}",
                actor_role.label(),
                target.role.label()
            ))
            .into());
        }

        self.ctx.user_repo().delete(target.id).await?;
        info!(user_id = %target.id, actor_id = %actor_id, "User deleted");
        Ok(())
    }

    /// Users only set their own presence
    #[instrument(skip(self))]
    pub async fn set_online_status(
        &self,
        caller_id: Snowflake,
        user_id: Snowflake,
        is_online: bool,
    ) -> ServiceResult<UserResponse> {
        if caller_id != user_id {
            return Err(DomainError::MissingPermission(
                "cannot change another user's status".to_string(),
            )
            .into());
        }

        let presence = PresenceService::new(self.ctx);
        let user = if is_online {
            presence.set_online(user_id).await?
        } else {
            presence.set_offline(user_id).await?
        };
        Ok(UserResponse::from(user))
    }

    pub async fn quota(&self, user_id: Snowflake) -> ServiceResult<QuotaResponse> {
        Ok(QuotaService::new(self.ctx).status(user_id).await?.into())
    }

    async fn load(&self, user_id: Snowflake) -> ServiceResult<User> {
        self.ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(user_id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;

    fn request(name: &str, role: Role) -> CreateUserRequest {
        CreateUserRequest {
            name: name.to_string(),
            role,
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn test_creation_is_role_gated() {
        let harness = TestHarness::new();
        let sarah = harness.user("Sarah", Role::Teacher).await;
        let service = UserService::new(&harness.ctx);

        let alice = service.create(sarah.id, request("Alice", Role::Student)).await.unwrap();
        assert_eq!(alice.role, Role::Student);

        let err = service
            .create(sarah.id, request("Tom", Role::Teacher))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);

        let alice_id = Snowflake::parse(&alice.id).unwrap();
        let err = service
            .create(alice_id, request("Bob", Role::Student))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_seeded_super_admin_creates_super_admins() {
        let harness = TestHarness::new();
        let root = harness.user("Root", Role::SuperAdmin).await;
        let created = UserService::new(&harness.ctx)
            .create(root.id, request("Second Root", Role::SuperAdmin))
            .await
            .unwrap();
        assert_eq!(created.role, Role::SuperAdmin);
    }

    #[tokio::test]
    async fn test_contacts_follow_permissions() {
        let harness = TestHarness::new();
        let alice = harness.user("Alice", Role::Student).await;
        harness.user("Bob", Role::Student).await;
        harness.user("Sarah", Role::Teacher).await;
        harness.user("Ada", Role::Admin).await;

        let contacts = UserService::new(&harness.ctx).contacts(alice.id).await.unwrap();
        let names: Vec<&str> = contacts.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["Sarah"]);
    }

    #[tokio::test]
    async fn test_delete_requires_higher_role() {
        let harness = TestHarness::new();
        let ada = harness.user("Ada", Role::Admin).await;
        let other_admin = harness.user("Ann", Role::Admin).await;
        let alice = harness.user("Alice", Role::Student).await;
        let sarah = harness.user("Sarah", Role::Teacher).await;
        let service = UserService::new(&harness.ctx);

        assert!(service.delete(ada.id, ada.role, other_admin.id).await.is_err());
        assert!(service.delete(sarah.id, sarah.role, alice.id).await.is_err());
        service.delete(ada.id, ada.role, alice.id).await.unwrap();
        assert!(service.get(alice.id).await.is_err());
    }

    #[tokio::test]
    async fn test_online_status_is_self_only() {
        let harness = TestHarness::new();
        let alice = harness.user("Alice", Role::Student).await;
        let bob = harness.user("Bob", Role::Student).await;
        let service = UserService::new(&harness.ctx);

        assert!(service.set_online_status(alice.id, bob.id, true).await.is_err());
        let updated = service.set_online_status(alice.id, alice.id, true).await.unwrap();
        assert!(updated.is_online);
    }

    #[tokio::test]
    async fn test_quota_response() {
        let harness = TestHarness::new();
        let alice = harness.user("Alice", Role::Student).await;
        let quota = UserService::new(&harness.ctx).quota(alice.id).await.unwrap();
        assert_eq!(quota.daily_limit, Some(50));
        assert_eq!(quota.remaining, Some(50));
        assert!(quota.can_send);
    }
}
