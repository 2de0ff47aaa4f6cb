//! PostgreSQL implementation of PermissionRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use rolechat_core::entities::{ChatPermission, RoleCapability, RoleSetting};
use rolechat_core::error::DomainError;
use rolechat_core::traits::{PermissionRepository, RepoResult};
use rolechat_core::value_objects::{Capabilities, Role};

use crate::mappers::ChatPermissionInsert;
use crate::models::{ChatPermissionModel, RoleCapabilityModel, RoleSettingModel};

use super::error::map_db_error;

/// PostgreSQL implementation of PermissionRepository
#[derive(Clone)]
pub struct PgPermissionRepository {
    pool: PgPool,
}

impl PgPermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn capability_name(capability: Capabilities) -> RepoResult<&'static str> {
    capability.name().ok_or_else(|| {
        DomainError::ValidationError(format!("not a single capability: {capability}"))
    })
}

#[async_trait]
impl PermissionRepository for PgPermissionRepository {
    #[instrument(skip(self))]
    async fn chat_permissions(&self) -> RepoResult<Vec<ChatPermission>> {
        let results = sqlx::query_as::<_, ChatPermissionModel>(
            r"
            SELECT role, can_chat_with, daily_message_limit, created_at, updated_at
            FROM chat_permissions
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(ChatPermission::try_from).collect()
    }

    #[instrument(skip(self), fields(role = %permission.role))]
    async fn upsert_chat_permission(&self, permission: &ChatPermission) -> RepoResult<()> {
        let insert = ChatPermissionInsert::new(permission)?;

        sqlx::query(
            r"
            INSERT INTO chat_permissions (role, can_chat_with, daily_message_limit, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (role) DO UPDATE
            SET can_chat_with = EXCLUDED.can_chat_with,
                daily_message_limit = EXCLUDED.daily_message_limit,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(insert.role)
        .bind(&insert.can_chat_with)
        .bind(insert.daily_message_limit)
        .bind(permission.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn role_settings(&self) -> RepoResult<Vec<RoleSetting>> {
        let results = sqlx::query_as::<_, RoleSettingModel>(
            r"
            SELECT role, key, value, created_by, created_at, updated_at
            FROM role_settings
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(RoleSetting::try_from).collect()
    }

    #[instrument(skip(self, setting), fields(role = %setting.role, key = %setting.key))]
    async fn upsert_role_setting(&self, setting: &RoleSetting) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO role_settings (role, key, value, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (role, key) DO UPDATE
            SET value = EXCLUDED.value,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(setting.role.as_str())
        .bind(&setting.key)
        .bind(&setting.value)
        .bind(setting.created_by.map(|id| id.into_inner()))
        .bind(setting.created_at)
        .bind(setting.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_role_setting(&self, role: Role, key: &str) -> RepoResult<()> {
        sqlx::query("DELETE FROM role_settings WHERE role = $1 AND key = $2")
            .bind(role.as_str())
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn role_capabilities(&self) -> RepoResult<Vec<RoleCapability>> {
        let results = sqlx::query_as::<_, RoleCapabilityModel>(
            r"
            SELECT role, capability, granted_by, created_at
            FROM role_capabilities
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(RoleCapability::try_from).collect()
    }

    #[instrument(skip(self, grant), fields(role = %grant.role, capability = %grant.capability))]
    async fn grant_capability(&self, grant: &RoleCapability) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO role_capabilities (role, capability, granted_by, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (role, capability) DO NOTHING
            ",
        )
        .bind(grant.role.as_str())
        .bind(capability_name(grant.capability)?)
        .bind(grant.granted_by.map(|id| id.into_inner()))
        .bind(grant.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn revoke_capability(&self, role: Role, capability: Capabilities) -> RepoResult<()> {
        sqlx::query("DELETE FROM role_capabilities WHERE role = $1 AND capability = $2")
            .bind(role.as_str())
            .bind(capability_name(capability)?)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }
}
