//! Ports implemented by infrastructure crates

mod broadcaster;
mod clock;
mod repositories;

pub use broadcaster::{Broadcaster, NoopBroadcaster};
pub use clock::{Clock, SystemClock};
pub use repositories::{
    ConversationRepository, GroupRepository, MessageQuery, MessageRepository,
    PermissionRepository, RepoResult, UserRepository,
};
