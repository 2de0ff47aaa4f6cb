//! Message entity <-> model mapper

use rolechat_core::entities::{Message, MessageKind, MessageTarget, ReadReceipt};
use rolechat_core::error::DomainError;
use rolechat_core::value_objects::Snowflake;

use crate::models::{MessageModel, MessageReadModel};

/// Assemble a message from its row and its read receipts
pub fn message_from_parts(
    model: MessageModel,
    reads: Vec<MessageReadModel>,
) -> Result<Message, DomainError> {
    let target = MessageTarget::from_parts(
        model.conversation_id.map(Snowflake::new),
        model.group_id.map(Snowflake::new),
    )
    .map_err(|e| DomainError::DatabaseError(format!("message {}: {e}", model.id)))?;

    if MessageKind::parse(&model.message_type) != Some(target.kind()) {
        return Err(DomainError::DatabaseError(format!(
            "message {} has type {} but targets a {}",
            model.id,
            model.message_type,
            target.kind()
        )));
    }

    let mut read_by: Vec<ReadReceipt> = reads
        .into_iter()
        .map(|r| ReadReceipt {
            user_id: Snowflake::new(r.reader_id),
            read_at: r.read_at,
        })
        .collect();
    read_by.sort_by_key(|r| (r.read_at, r.user_id));

    Ok(Message {
        id: Snowflake::new(model.id),
        sender_id: Snowflake::new(model.sender_id),
        content: model.content,
        target,
        is_read: model.is_read,
        read_by,
        created_at: model.created_at,
    })
}

/// Column values for inserting a message
pub struct MessageInsert<'a> {
    pub id: i64,
    pub sender_id: i64,
    pub content: &'a str,
    pub message_type: &'static str,
    pub conversation_id: Option<i64>,
    pub group_id: Option<i64>,
}

impl<'a> MessageInsert<'a> {
    pub fn new(message: &'a Message) -> Self {
        Self {
            id: message.id.into_inner(),
            sender_id: message.sender_id.into_inner(),
            content: &message.content,
            message_type: message.kind().as_str(),
            conversation_id: message.target.conversation_id().map(Snowflake::into_inner),
            group_id: message.target.group_id().map(Snowflake::into_inner),
        }
    }
}
