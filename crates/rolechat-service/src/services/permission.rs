//! Permission service
//!
//! Loads the permission tables into a cached [`PermissionSnapshot`], answers
//! "may A message B" and "may this role do X", and applies the admin
//! mutations that invalidate the cache.

use std::sync::Arc;

use rolechat_core::entities::{ChatRestrictions, CHAT_RESTRICTIONS_KEY};
use rolechat_core::permissions::{can_perform, creatable_roles};
use rolechat_core::{
    Capabilities, ChatPermission, DomainError, PermissionSnapshot, Role, RoleCapability,
    RoleSetting, Snowflake,
};
use tracing::{debug, info, instrument};
use validator::Validate;

use crate::dto::{
    PermissionOverviewResponse, RolePermissionResponse, UpdateChatPermissionRequest,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Encoded size cap for one role setting value. Row changes travel as
/// `NOTIFY` payloads, which PostgreSQL limits to 8000 bytes.
pub const MAX_SETTING_VALUE_BYTES: usize = 4096;

pub struct PermissionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PermissionService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    // ========================================================================
    // Snapshot
    // ========================================================================

    /// Current permission snapshot, loaded from the repositories on a miss
    pub async fn snapshot(&self) -> ServiceResult<Arc<PermissionSnapshot>> {
        let cache = self.ctx.permission_cache();
        if let Some(snapshot) = cache.get() {
            return Ok(snapshot);
        }

        let generation = cache.generation();
        let repo = self.ctx.permission_repo();
        let snapshot = Arc::new(PermissionSnapshot::new(
            repo.chat_permissions().await?,
            repo.role_settings().await?,
            repo.role_capabilities().await?,
        ));
        cache.store(generation, Arc::clone(&snapshot));
        debug!(generation, "Permission snapshot loaded");

        Ok(snapshot)
    }

    pub fn invalidate(&self) {
        self.ctx.permission_cache().invalidate();
        debug!("Permission snapshot invalidated");
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn can_communicate(&self, sender: Role, recipient: Role) -> ServiceResult<bool> {
        let snapshot = self.snapshot().await?;
        Ok(self.ctx.resolver().can_communicate(&snapshot, sender, recipient))
    }

    /// Fails with `PermissionDenied` naming both roles
    pub async fn require_communicate(&self, sender: Role, recipient: Role) -> ServiceResult<()> {
        if self.can_communicate(sender, recipient).await? {
            Ok(())
        } else {
            Err(DomainError::PermissionDenied {
                sender_role: sender,
                recipient_role: recipient,
            }
            .into())
        }
    }

    pub async fn can_perform(&self, role: Role, action: Capabilities) -> ServiceResult<bool> {
        let snapshot = self.snapshot().await?;
        Ok(can_perform(&snapshot, role, action))
    }

    /// Fails with `MissingPermission` naming the capability
    pub async fn require_action(&self, role: Role, action: Capabilities) -> ServiceResult<()> {
        if self.can_perform(role, action).await? {
            Ok(())
        } else {
            let name = action.name().unwrap_or("unknown").to_string();
            Err(DomainError::MissingPermission(name).into())
        }
    }

    pub async fn reachable_roles(&self, sender: Role) -> ServiceResult<Vec<Role>> {
        let snapshot = self.snapshot().await?;
        Ok(self.ctx.resolver().reachable_roles(&snapshot, sender))
    }

    pub async fn creatable_roles(&self, creator: Role) -> ServiceResult<&'static [Role]> {
        let snapshot = self.snapshot().await?;
        Ok(creatable_roles(&snapshot, creator))
    }

    /// Effective daily limit; `None` is unlimited
    pub async fn daily_limit(&self, role: Role) -> ServiceResult<Option<u32>> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.daily_limit(role))
    }

    /// Every role with its effective rules
    pub async fn overview(&self) -> ServiceResult<PermissionOverviewResponse> {
        let snapshot = self.snapshot().await?;
        let resolver = self.ctx.resolver();

        let roles = Role::ALL
            .into_iter()
            .map(|role| RolePermissionResponse {
                role,
                level: role.level(),
                reachable_roles: resolver.reachable_roles(&snapshot, role),
                daily_message_limit: snapshot.daily_limit(role),
                capabilities: snapshot.capabilities(role).names(),
                table_can_chat_with: snapshot
                    .chat_permission(role)
                    .map(|row| row.can_chat_with.clone()),
                override_can_chat_with: snapshot
                    .restrictions(role)
                    .map(|r| r.can_chat_with.clone()),
            })
            .collect();

        Ok(PermissionOverviewResponse { roles })
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Replace the static table row for `role`
    #[instrument(skip(self, request))]
    pub async fn update_chat_permission(
        &self,
        actor_role: Role,
        role: Role,
        request: UpdateChatPermissionRequest,
    ) -> ServiceResult<ChatPermission> {
        self.require_action(actor_role, Capabilities::MODIFY_USER_ROLES)
            .await?;
        request.validate()?;

        let mut can_chat_with = request.can_chat_with;
        can_chat_with.sort_by_key(|r| std::cmp::Reverse(r.level()));
        can_chat_with.dedup();

        let row = ChatPermission::new(
            role,
            can_chat_with,
            request.daily_message_limit,
            self.ctx.clock().now(),
        );
        self.ctx.permission_repo().upsert_chat_permission(&row).await?;
        self.invalidate();

        info!(role = %role, limit = ?row.daily_message_limit, "Chat permission updated");
        Ok(row)
    }

    /// Upsert a settings blob. `chat_restrictions` values must parse.
    #[instrument(skip(self, value))]
    pub async fn update_role_setting(
        &self,
        actor_id: Snowflake,
        actor_role: Role,
        role: Role,
        key: &str,
        value: serde_json::Value,
    ) -> ServiceResult<RoleSetting> {
        self.require_action(actor_role, Capabilities::MODIFY_USER_ROLES)
            .await?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ServiceError::validation("setting key cannot be empty"));
        }
        if key.len() > 100 {
            return Err(ServiceError::validation("setting key must be at most 100 characters"));
        }
        if value.to_string().len() > MAX_SETTING_VALUE_BYTES {
            return Err(ServiceError::validation(format!(
                "setting value must encode to at most {MAX_SETTING_VALUE_BYTES} bytes"
            )));
        }
        if key == CHAT_RESTRICTIONS_KEY {
            validate_restrictions(&value)?;
        }

        let setting = RoleSetting::new(role, key, value, Some(actor_id), self.ctx.clock().now());
        self.ctx.permission_repo().upsert_role_setting(&setting).await?;
        self.invalidate();

        info!(role = %role, key = %key, "Role setting updated");
        Ok(setting)
    }

    #[instrument(skip(self))]
    pub async fn delete_role_setting(
        &self,
        actor_role: Role,
        role: Role,
        key: &str,
    ) -> ServiceResult<()> {
        self.require_action(actor_role, Capabilities::MODIFY_USER_ROLES)
            .await?;
        self.ctx.permission_repo().delete_role_setting(role, key).await?;
        self.invalidate();

        info!(role = %role, key = %key, "Role setting deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn grant_capability(
        &self,
        actor_id: Snowflake,
        actor_role: Role,
        role: Role,
        name: &str,
    ) -> ServiceResult<RoleCapability> {
        self.require_action(actor_role, Capabilities::MODIFY_USER_ROLES)
            .await?;
        let capability = parse_capability(name)?;

        let grant = RoleCapability {
            role,
            capability,
            granted_by: Some(actor_id),
            created_at: self.ctx.clock().now(),
        };
        self.ctx.permission_repo().grant_capability(&grant).await?;
        self.invalidate();

        info!(role = %role, capability = name, "Capability granted");
        Ok(grant)
    }

    #[instrument(skip(self))]
    pub async fn revoke_capability(
        &self,
        actor_role: Role,
        role: Role,
        name: &str,
    ) -> ServiceResult<()> {
        self.require_action(actor_role, Capabilities::MODIFY_USER_ROLES)
            .await?;
        let capability = parse_capability(name)?;

        self.ctx
            .permission_repo()
            .revoke_capability(role, capability)
            .await?;
        self.invalidate();

        info!(role = %role, capability = name, "Capability revoked");
        Ok(())
    }
}

fn parse_capability(name: &str) -> ServiceResult<Capabilities> {
    Capabilities::from_catalog_name(name.trim())
        .ok_or_else(|| ServiceError::validation(format!("unknown capability: {name}")))
}

/// Every role name must be known and the limit, when present, positive
fn validate_restrictions(value: &serde_json::Value) -> ServiceResult<ChatRestrictions> {
    let roles = value
        .get("can_chat_with")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| ServiceError::validation("chat_restrictions needs a can_chat_with array"))?;

    for role in roles {
        let known = role.as_str().and_then(Role::parse).is_some();
        if !known {
            return Err(ServiceError::validation(format!("unknown role in can_chat_with: {role}")));
        }
    }

    match value.get("max_daily_messages") {
        None | Some(serde_json::Value::Null) => {}
        Some(limit) if limit.as_u64().is_some_and(|n| n > 0 && n <= u64::from(u32::MAX)) => {}
        Some(limit) => {
            return Err(ServiceError::validation(format!(
                "max_daily_messages must be a positive integer or null, got {limit}"
            )))
        }
    }

    ChatRestrictions::from_value(value)
        .ok_or_else(|| ServiceError::validation("malformed chat_restrictions"))
}
