//! Database models - SQLx-compatible structs for PostgreSQL tables

mod conversation;
mod group;
mod message;
mod permission;
mod user;

pub use conversation::ConversationModel;
pub use group::{GroupMemberModel, GroupModel};
pub use message::{MessageModel, MessageReadModel};
pub use permission::{ChatPermissionModel, RoleCapabilityModel, RoleSettingModel};
pub use user::UserModel;
