//! PostgreSQL implementation of ConversationRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use rolechat_core::entities::{Conversation, ParticipantPair};
use rolechat_core::error::DomainError;
use rolechat_core::traits::{ConversationRepository, RepoResult};
use rolechat_core::value_objects::Snowflake;

use crate::models::ConversationModel;

use super::error::{conversation_not_found, map_db_error, map_unique_violation};

/// PostgreSQL implementation of ConversationRepository
///
/// Pairs are stored low id first, so `UNIQUE (participant_1, participant_2)`
/// covers the unordered pair.
#[derive(Clone)]
pub struct PgConversationRepository {
    pool: PgPool,
}

impl PgConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for PgConversationRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Conversation>> {
        let result = sqlx::query_as::<_, ConversationModel>(
            r"
            SELECT id, participant_1, participant_2, last_message_at, created_at
            FROM conversations
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Conversation::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_pair(&self, pair: &ParticipantPair) -> RepoResult<Option<Conversation>> {
        let result = sqlx::query_as::<_, ConversationModel>(
            r"
            SELECT id, participant_1, participant_2, last_message_at, created_at
            FROM conversations
            WHERE participant_1 = $1 AND participant_2 = $2
            ",
        )
        .bind(pair.low().into_inner())
        .bind(pair.high().into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Conversation::try_from).transpose()
    }

    #[instrument(skip(self), fields(conversation_id = %conversation.id))]
    async fn create(&self, conversation: &Conversation) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO conversations (id, participant_1, participant_2, last_message_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(conversation.id.into_inner())
        .bind(conversation.participants.low().into_inner())
        .bind(conversation.participants.high().into_inner())
        .bind(conversation.last_message_at)
        .bind(conversation.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                debug!("lost conversation insert race");
                DomainError::ConversationConflict
            })
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: Snowflake) -> RepoResult<Vec<Conversation>> {
        let results = sqlx::query_as::<_, ConversationModel>(
            r"
            SELECT id, participant_1, participant_2, last_message_at, created_at
            FROM conversations
            WHERE participant_1 = $1 OR participant_2 = $1
            ORDER BY last_message_at DESC, id DESC
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(Conversation::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        // messages cascade
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(conversation_not_found(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_if_empty(&self, id: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            DELETE FROM conversations c
            WHERE c.id = $1
              AND NOT EXISTS (SELECT 1 FROM messages m WHERE m.conversation_id = c.id)
            ",
        )
        .bind(id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}
