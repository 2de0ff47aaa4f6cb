//! Domain entities - core business objects

mod conversation;
mod group;
mod message;
mod permission;
mod user;

pub use conversation::{Conversation, ParticipantPair};
pub use group::{Group, GroupMember, GroupRole};
pub use message::{
    normalize_content, Message, MessageKind, MessageTarget, ReadReceipt, MAX_CONTENT_LENGTH,
};
pub use permission::{
    ChatPermission, ChatRestrictions, RoleCapability, RoleSetting, CHAT_RESTRICTIONS_KEY,
};
pub use user::{PublicProfile, User};
