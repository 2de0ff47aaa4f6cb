//! Entity to model mappers
//!
//! - `TryFrom<Model> for Entity`: convert database rows to domain objects.
//!   Text columns holding enums are re-validated; a bad value is a
//!   `DatabaseError`, never a panic.
//! - `*Insert` structs: prepare entity data for database writes

mod conversation;
mod group;
mod message;
mod permission;
mod user;

use rolechat_core::error::DomainError;
use rolechat_core::value_objects::Role;

pub use message::{message_from_parts, MessageInsert};
pub use permission::ChatPermissionInsert;

pub(crate) fn parse_role(value: &str) -> Result<Role, DomainError> {
    Role::parse(value)
        .ok_or_else(|| DomainError::DatabaseError(format!("invalid role in database: {value}")))
}
