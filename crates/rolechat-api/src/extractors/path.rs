//! Typed path parameters
//!
//! Ids arrive as strings and are parsed into [`Snowflake`]s here, so a bad
//! id is a 400 before any handler runs.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use rolechat_core::{Role, Snowflake};
use serde::Deserialize;

use crate::response::ApiError;

fn parse_snowflake(name: &str, raw: &str) -> Result<Snowflake, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::invalid_path(format!("Invalid {name} format")))
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    Role::parse(raw).ok_or_else(|| ApiError::invalid_path(format!("Unknown role: {raw}")))
}

async fn raw_path<S, T>(parts: &mut Parts, state: &S) -> Result<T, ApiError>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned + Send,
{
    let Path(inner) = Path::<T>::from_request_parts(parts, state)
        .await
        .map_err(|e| ApiError::invalid_path(e.to_string()))?;
    Ok(inner)
}

/// `/:id`
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub Snowflake);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for IdPath {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        #[derive(Deserialize)]
        struct Raw {
            id: String,
        }
        let raw: Raw = raw_path(parts, state).await?;
        Ok(Self(parse_snowflake("id", &raw.id)?))
    }
}

/// `/groups/:id/members/:user_id`
#[derive(Debug, Clone, Copy)]
pub struct GroupMemberPath {
    pub group_id: Snowflake,
    pub user_id: Snowflake,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for GroupMemberPath {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        #[derive(Deserialize)]
        struct Raw {
            id: String,
            user_id: String,
        }
        let raw: Raw = raw_path(parts, state).await?;
        Ok(Self {
            group_id: parse_snowflake("group id", &raw.id)?,
            user_id: parse_snowflake("user_id", &raw.user_id)?,
        })
    }
}

/// `/:role`
#[derive(Debug, Clone, Copy)]
pub struct RolePath(pub Role);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RolePath {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        #[derive(Deserialize)]
        struct Raw {
            role: String,
        }
        let raw: Raw = raw_path(parts, state).await?;
        Ok(Self(parse_role(&raw.role)?))
    }
}

/// `/:role/:key` and `/:role/:name`
#[derive(Debug, Clone)]
pub struct RoleKeyPath {
    pub role: Role,
    pub key: String,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RoleKeyPath {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let (role, key): (String, String) = raw_path(parts, state).await?;
        Ok(Self {
            role: parse_role(&role)?,
            key,
        })
    }
}
