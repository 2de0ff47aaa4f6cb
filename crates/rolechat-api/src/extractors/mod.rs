//! Axum extractors for request handling
//!
//! Custom extractors for authentication, validation, path ids and query strings.

mod auth;
mod path;
mod query;
mod validated;

pub use auth::AuthUser;
pub use path::{GroupMemberPath, IdPath, RoleKeyPath, RolePath};
pub use query::QueryParams;
pub use validated::ValidatedJson;
