//! Message database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for messages table
#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: i64,
    pub sender_id: i64,
    pub content: String,
    pub message_type: String,
    pub conversation_id: Option<i64>,
    pub group_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Database model for message_reads table
#[derive(Debug, Clone, FromRow)]
pub struct MessageReadModel {
    pub message_id: i64,
    pub reader_id: i64,
    pub read_at: DateTime<Utc>,
}
