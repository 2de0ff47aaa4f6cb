//! Group service
//!
//! Group lifecycle and membership. The creator joins as the group's first admin.

use std::collections::HashMap;

use rolechat_core::events::RoomAccessRevokedPayload;
use rolechat_core::{
    BroadcastScope, Capabilities, DomainError, EventKind, Group, GroupMember, GroupRole,
    RealtimeEvent, Role, Snowflake, User,
};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::dto::{CreateGroupRequest, GroupResponse, GroupWithMembers};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::permission::PermissionService;

pub struct GroupService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> GroupService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        creator_id: Snowflake,
        request: CreateGroupRequest,
    ) -> ServiceResult<GroupResponse> {
        request.validate()?;
        let creator = self.load_user(creator_id).await?;

        let now = self.ctx.clock().now();
        let mut group = Group::new(self.ctx.generate_id(), request.name.trim().to_string(), creator.id, now);
        group.description = request.description.filter(|d| !d.trim().is_empty());
        group.avatar_url = request.avatar_url;
        let owner = GroupMember::new(group.id, creator.id, GroupRole::Admin, now);

        self.ctx.group_repo().create(&group, &owner).await?;
        info!(group_id = %group.id, creator_id = %creator.id, "Group created");

        Ok(GroupResponse::from(GroupWithMembers {
            group,
            members: vec![(owner, Some(creator.profile()))],
        }))
    }

    /// Add `user_id` to the group. Adding an existing member is a no-op.
    #[instrument(skip(self))]
    pub async fn add_member(
        &self,
        group_id: Snowflake,
        actor_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<GroupResponse> {
        let group = self.find(group_id).await?;
        self.require_admin(group.id, actor_id).await?;
        let user = self.load_user(user_id).await?;

        let member = GroupMember::new(group.id, user.id, GroupRole::Member, self.ctx.clock().now());
        match self.ctx.group_repo().add_member(&member).await {
            Ok(()) => info!(group_id = %group.id, user_id = %user.id, "Member added"),
            Err(DomainError::AlreadyMember) => {}
            Err(e) => return Err(e.into()),
        }

        self.with_members(group).await
    }

    /// Group admins may remove anyone but the creator; members may leave
    #[instrument(skip(self))]
    pub async fn remove_member(
        &self,
        group_id: Snowflake,
        actor_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<()> {
        let group = self.find(group_id).await?;
        if actor_id != user_id {
            self.require_admin(group.id, actor_id).await?;
        }
        if group.is_owner(user_id) {
            return Err(DomainError::ValidationError(
                "the group creator cannot be removed".to_string(),
            )
            .into());
        }

        self.require_member(group.id, user_id).await?;
        self.ctx.group_repo().remove_member(group.id, user_id).await?;
        info!(group_id = %group.id, user_id = %user_id, actor_id = %actor_id, "Member removed");

        let revoked = RoomAccessRevokedPayload {
            user_id: Some(user_id),
            conversation_id: None,
            group_id: Some(group.id),
        };
        match RealtimeEvent::from_payload(EventKind::RoomAccessRevoked, &revoked) {
            Ok(event) => self.ctx.publish(BroadcastScope::Group(group.id), event).await,
            Err(e) => warn!(group_id = %group.id, error = %e, "Failed to encode revocation"),
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: Snowflake) -> ServiceResult<Vec<GroupResponse>> {
        let groups = self.ctx.group_repo().list_for_user(user_id).await?;
        Ok(groups.into_iter().map(GroupResponse::from).collect())
    }

    /// Members, or holders of `view_all_conversations`
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        viewer_id: Snowflake,
        viewer_role: Role,
        group_id: Snowflake,
    ) -> ServiceResult<GroupResponse> {
        let group = self.find(group_id).await?;
        self.require_viewer(group.id, viewer_id, viewer_role).await?;
        self.with_members(group).await
    }

    /// The caller's membership, or `MembershipRequired`
    pub async fn require_member(
        &self,
        group_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<GroupMember> {
        self.ctx
            .group_repo()
            .find_member(group_id, user_id)
            .await?
            .ok_or_else(|| DomainError::MembershipRequired.into())
    }

    pub async fn require_viewer(
        &self,
        group_id: Snowflake,
        viewer_id: Snowflake,
        viewer_role: Role,
    ) -> ServiceResult<()> {
        if self.ctx.group_repo().find_member(group_id, viewer_id).await?.is_some() {
            return Ok(());
        }
        let oversight = PermissionService::new(self.ctx)
            .can_perform(viewer_role, Capabilities::VIEW_ALL_CONVERSATIONS)
            .await?;
        if oversight {
            Ok(())
        } else {
            Err(DomainError::MembershipRequired.into())
        }
    }

    pub async fn find(&self, group_id: Snowflake) -> ServiceResult<Group> {
        self.ctx
            .group_repo()
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| DomainError::GroupNotFound(group_id).into())
    }

    async fn require_admin(&self, group_id: Snowflake, actor_id: Snowflake) -> ServiceResult<()> {
        let member = self.require_member(group_id, actor_id).await?;
        if member.is_admin() {
            Ok(())
        } else {
            Err(DomainError::MissingPermission("group_admin".to_string()).into())
        }
    }

    async fn with_members(&self, group: Group) -> ServiceResult<GroupResponse> {
        let members = self.ctx.group_repo().members(group.id).await?;
        let ids: Vec<Snowflake> = members.iter().map(|m| m.user_id).collect();
        let users: HashMap<Snowflake, User> = self
            .ctx
            .user_repo()
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let members = members
            .into_iter()
            .map(|m| {
                let profile = users.get(&m.user_id).map(User::profile);
                (m, profile)
            })
            .collect();
        Ok(GroupResponse::from(GroupWithMembers { group, members }))
    }

    async fn load_user(&self, user_id: Snowflake) -> ServiceResult<User> {
        self.ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(user_id).into())
    }
}
