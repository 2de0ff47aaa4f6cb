//! Conversation database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for conversations table (`participant_1 < participant_2`)
#[derive(Debug, Clone, FromRow)]
pub struct ConversationModel {
    pub id: i64,
    pub participant_1: i64,
    pub participant_2: i64,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
