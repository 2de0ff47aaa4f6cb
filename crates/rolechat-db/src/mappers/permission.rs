//! Permission entities <-> model mappers

use rolechat_core::entities::{ChatPermission, RoleCapability, RoleSetting};
use rolechat_core::error::DomainError;
use rolechat_core::value_objects::{Capabilities, Snowflake};

use super::parse_role;
use crate::models::{ChatPermissionModel, RoleCapabilityModel, RoleSettingModel};

impl TryFrom<ChatPermissionModel> for ChatPermission {
    type Error = DomainError;

    fn try_from(model: ChatPermissionModel) -> Result<Self, Self::Error> {
        let can_chat_with = model
            .can_chat_with
            .iter()
            .map(|r| parse_role(r))
            .collect::<Result<Vec<_>, _>>()?;

        let mut permission = ChatPermission::new(
            parse_role(&model.role)?,
            can_chat_with,
            model
                .daily_message_limit
                .and_then(|limit| u32::try_from(limit).ok()),
            model.created_at,
        );
        permission.updated_at = model.updated_at;
        Ok(permission)
    }
}

impl TryFrom<RoleSettingModel> for RoleSetting {
    type Error = DomainError;

    fn try_from(model: RoleSettingModel) -> Result<Self, Self::Error> {
        Ok(RoleSetting {
            role: parse_role(&model.role)?,
            key: model.key,
            value: model.value,
            created_by: model.created_by.map(Snowflake::new),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl TryFrom<RoleCapabilityModel> for RoleCapability {
    type Error = DomainError;

    fn try_from(model: RoleCapabilityModel) -> Result<Self, Self::Error> {
        let capability = Capabilities::from_catalog_name(&model.capability).ok_or_else(|| {
            DomainError::DatabaseError(format!("unknown capability: {}", model.capability))
        })?;

        Ok(RoleCapability {
            role: parse_role(&model.role)?,
            capability,
            granted_by: model.granted_by.map(Snowflake::new),
            created_at: model.created_at,
        })
    }
}

/// Column values for upserting a chat permission row
pub struct ChatPermissionInsert {
    pub role: &'static str,
    pub can_chat_with: Vec<&'static str>,
    pub daily_message_limit: Option<i32>,
}

impl ChatPermissionInsert {
    pub fn new(permission: &ChatPermission) -> Result<Self, DomainError> {
        let daily_message_limit = permission
            .daily_message_limit
            .map(i32::try_from)
            .transpose()
            .map_err(|_| DomainError::ValidationError("daily limit is too large".to_string()))?;

        Ok(Self {
            role: permission.role.as_str(),
            can_chat_with: permission.can_chat_with.iter().map(|r| r.as_str()).collect(),
            daily_message_limit,
        })
    }
}
