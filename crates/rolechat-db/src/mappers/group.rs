//! Group entity <-> model mapper

use rolechat_core::entities::{Group, GroupMember, GroupRole};
use rolechat_core::error::DomainError;
use rolechat_core::value_objects::Snowflake;

use crate::models::{GroupMemberModel, GroupModel};

impl From<GroupModel> for Group {
    fn from(model: GroupModel) -> Self {
        Group {
            id: Snowflake::new(model.id),
            name: model.name,
            description: model.description,
            avatar_url: model.avatar_url,
            created_by: Snowflake::new(model.created_by),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl TryFrom<GroupMemberModel> for GroupMember {
    type Error = DomainError;

    fn try_from(model: GroupMemberModel) -> Result<Self, Self::Error> {
        let role = GroupRole::parse(&model.role).ok_or_else(|| {
            DomainError::DatabaseError(format!("invalid group role in database: {}", model.role))
        })?;

        Ok(GroupMember {
            group_id: Snowflake::new(model.group_id),
            user_id: Snowflake::new(model.user_id),
            role,
            joined_at: model.joined_at,
        })
    }
}
