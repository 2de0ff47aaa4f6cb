//! Message entity - addressed to exactly one conversation or one group

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Default upper bound on message length, in characters
pub const MAX_CONTENT_LENGTH: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Conversation,
    Group,
}

impl MessageKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            MessageKind::Conversation => "conversation",
            MessageKind::Group => "group",
        }
    }

    pub fn parse(s: &str) -> Option<MessageKind> {
        match s {
            "conversation" => Some(MessageKind::Conversation),
            "group" => Some(MessageKind::Group),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a message lives. Having one enum makes "both" and "neither" unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTarget {
    Conversation(Snowflake),
    Group(Snowflake),
}

impl MessageTarget {
    /// Build a target from nullable columns, rejecting both-set and neither-set
    pub fn from_parts(
        conversation_id: Option<Snowflake>,
        group_id: Option<Snowflake>,
    ) -> Result<Self, DomainError> {
        match (conversation_id, group_id) {
            (Some(id), None) => Ok(MessageTarget::Conversation(id)),
            (None, Some(id)) => Ok(MessageTarget::Group(id)),
            (Some(_), Some(_)) => Err(DomainError::ValidationError(
                "message cannot belong to both a conversation and a group".to_string(),
            )),
            (None, None) => Err(DomainError::ValidationError(
                "message must belong to either a conversation or a group".to_string(),
            )),
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            MessageTarget::Conversation(_) => MessageKind::Conversation,
            MessageTarget::Group(_) => MessageKind::Group,
        }
    }

    pub fn conversation_id(&self) -> Option<Snowflake> {
        match self {
            MessageTarget::Conversation(id) => Some(*id),
            MessageTarget::Group(_) => None,
        }
    }

    pub fn group_id(&self) -> Option<Snowflake> {
        match self {
            MessageTarget::Group(id) => Some(*id),
            MessageTarget::Conversation(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub user_id: Snowflake,
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Snowflake,
    pub sender_id: Snowflake,
    pub content: String,
    pub target: MessageTarget,
    pub is_read: bool,
    pub read_by: Vec<ReadReceipt>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        id: Snowflake,
        sender_id: Snowflake,
        content: String,
        target: MessageTarget,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sender_id,
            content,
            target,
            is_read: false,
            read_by: Vec::new(),
            created_at,
        }
    }

    #[inline]
    pub fn kind(&self) -> MessageKind {
        self.target.kind()
    }

    pub fn has_read(&self, user_id: Snowflake) -> bool {
        self.read_by.iter().any(|r| r.user_id == user_id)
    }

    /// Append a receipt unless `reader` already has one. Returns whether it was appended.
    pub fn record_read(&mut self, reader: Snowflake, at: DateTime<Utc>) -> bool {
        if self.has_read(reader) {
            return false;
        }
        self.read_by.push(ReadReceipt {
            user_id: reader,
            read_at: at,
        });
        true
    }

    /// Recompute `is_read` for a conversation message: every participant
    /// other than the sender must hold a receipt. Group messages never flip.
    pub fn refresh_is_read(&mut self, participants: &[Snowflake]) {
        if self.kind() != MessageKind::Conversation {
            return;
        }
        self.is_read = participants
            .iter()
            .filter(|p| **p != self.sender_id)
            .all(|p| self.has_read(*p));
    }

    /// Truncated content for notifications
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.content.char_indices().nth(max_chars) {
            Some((end, _)) => &self.content[..end],
            None => &self.content,
        }
    }
}

/// Trim and bound message content. Returns the trimmed text.
pub fn normalize_content(content: &str, max_chars: usize) -> Result<String, DomainError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(DomainError::ValidationError(
            "message content cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > max_chars {
        return Err(DomainError::ContentTooLong { max: max_chars });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation_message() -> Message {
        Message::new(
            Snowflake::new(100),
            Snowflake::new(1),
            "Hello Alice!".into(),
            MessageTarget::Conversation(Snowflake::new(50)),
            Utc::now(),
        )
    }

    #[test]
    fn test_target_requires_exactly_one() {
        let c = Some(Snowflake::new(1));
        let g = Some(Snowflake::new(2));
        assert_eq!(
            MessageTarget::from_parts(c, None).unwrap(),
            MessageTarget::Conversation(Snowflake::new(1))
        );
        assert_eq!(
            MessageTarget::from_parts(None, g).unwrap(),
            MessageTarget::Group(Snowflake::new(2))
        );
        assert!(MessageTarget::from_parts(c, g).unwrap_err().is_validation());
        assert!(MessageTarget::from_parts(None, None).unwrap_err().is_validation());
    }

    #[test]
    fn test_record_read_is_idempotent() {
        let mut msg = conversation_message();
        let now = Utc::now();
        assert!(msg.record_read(Snowflake::new(2), now));
        assert!(!msg.record_read(Snowflake::new(2), now));
        assert_eq!(msg.read_by.len(), 1);
    }

    #[test]
    fn test_is_read_ignores_sender() {
        let mut msg = conversation_message();
        let participants = [Snowflake::new(1), Snowflake::new(2)];

        msg.refresh_is_read(&participants);
        assert!(!msg.is_read);

        msg.record_read(Snowflake::new(2), Utc::now());
        msg.refresh_is_read(&participants);
        assert!(msg.is_read);
    }

    #[test]
    fn test_group_message_never_flips_is_read() {
        let mut msg = Message::new(
            Snowflake::new(100),
            Snowflake::new(1),
            "hi all".into(),
            MessageTarget::Group(Snowflake::new(9)),
            Utc::now(),
        );
        msg.record_read(Snowflake::new(2), Utc::now());
        msg.refresh_is_read(&[Snowflake::new(1), Snowflake::new(2)]);
        assert!(!msg.is_read);
    }

    #[test]
    fn test_normalize_content() {
        assert_eq!(normalize_content("  hi  ", 10).unwrap(), "hi");
        assert!(normalize_content("   ", 10).unwrap_err().is_validation());
        assert!(matches!(
            normalize_content("abcdef", 5),
            Err(DomainError::ContentTooLong { max: 5 })
        ));
        // counts characters, not bytes
        assert!(normalize_content("ééééé", 5).is_ok());
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let mut msg = conversation_message();
        msg.content = "héllo wörld".into();
        assert_eq!(msg.preview(5), "héllo");
        assert_eq!(msg.preview(50), "héllo wörld");
    }
}
