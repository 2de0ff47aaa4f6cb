//! sqlx error translation shared by the Postgres repositories

use rolechat_core::error::DomainError;
use rolechat_core::value_objects::Snowflake;
use sqlx::error::ErrorKind;

/// Anything not translated into a domain condition
pub fn map_db_error(e: sqlx::Error) -> DomainError {
    tracing::error!(error = %e, "database error");
    DomainError::DatabaseError(e.to_string())
}

fn constraint_kind(e: &sqlx::Error) -> Option<ErrorKind> {
    e.as_database_error().map(|db| db.kind())
}

/// A unique index rejected the write
pub fn map_unique_violation(e: sqlx::Error, on_unique: impl FnOnce() -> DomainError) -> DomainError {
    match constraint_kind(&e) {
        Some(ErrorKind::UniqueViolation) => on_unique(),
        _ => map_db_error(e),
    }
}

/// A referenced row is missing
pub fn map_foreign_key_violation(
    e: sqlx::Error,
    on_missing: impl FnOnce() -> DomainError,
) -> DomainError {
    match constraint_kind(&e) {
        Some(ErrorKind::ForeignKeyViolation) => on_missing(),
        _ => map_db_error(e),
    }
}

pub fn user_not_found(id: Snowflake) -> DomainError {
    DomainError::UserNotFound(id)
}

pub fn conversation_not_found(id: Snowflake) -> DomainError {
    DomainError::ConversationNotFound(id)
}

pub fn group_not_found(id: Snowflake) -> DomainError {
    DomainError::GroupNotFound(id)
}

pub fn message_not_found(id: Snowflake) -> DomainError {
    DomainError::MessageNotFound(id)
}
