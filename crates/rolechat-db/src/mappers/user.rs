//! User entity <-> model mapper

use rolechat_core::entities::User;
use rolechat_core::error::DomainError;
use rolechat_core::value_objects::Snowflake;

use super::parse_role;
use crate::models::UserModel;

impl TryFrom<UserModel> for User {
    type Error = DomainError;

    fn try_from(model: UserModel) -> Result<Self, Self::Error> {
        Ok(User {
            id: Snowflake::new(model.id),
            name: model.name,
            role: parse_role(&model.role)?,
            avatar_url: model.avatar_url,
            is_online: model.is_online,
            last_seen: model.last_seen,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
