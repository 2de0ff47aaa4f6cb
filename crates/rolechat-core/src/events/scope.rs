//! Broadcast scopes - which subscribers receive an event

use std::fmt;

use crate::value_objects::Snowflake;

/// Audience of a published event. Each scope maps to one room name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastScope {
    Conversation(Snowflake),
    Group(Snowflake),
    /// A single user's personal room (every connection of that user)
    User(Snowflake),
    /// Every connected client
    All,
}

impl BroadcastScope {
    /// Room name, e.g. `conversation:123`
    pub fn room(&self) -> String {
        match self {
            Self::Conversation(id) => format!("conversation:{id}"),
            Self::Group(id) => format!("group:{id}"),
            Self::User(id) => format!("user:{id}"),
            Self::All => "broadcast".to_string(),
        }
    }

    pub fn parse(room: &str) -> Option<Self> {
        if room == "broadcast" {
            return Some(Self::All);
        }
        let (prefix, id) = room.split_once(':')?;
        let id = Snowflake::parse(id).ok()?;
        match prefix {
            "conversation" => Some(Self::Conversation(id)),
            "group" => Some(Self::Group(id)),
            "user" => Some(Self::User(id)),
            _ => None,
        }
    }
}

impl fmt::Display for BroadcastScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.room())
    }
}
