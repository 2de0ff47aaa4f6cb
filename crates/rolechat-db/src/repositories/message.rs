//! PostgreSQL implementation of MessageRepository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use rolechat_core::entities::{Message, MessageTarget};
use rolechat_core::error::DomainError;
use rolechat_core::traits::{MessageQuery, MessageRepository, RepoResult};
use rolechat_core::value_objects::Snowflake;

use crate::mappers::{message_from_parts, MessageInsert};
use crate::models::{MessageModel, MessageReadModel};

use super::error::{
    conversation_not_found, group_not_found, map_db_error, map_foreign_key_violation,
    message_not_found,
};

const MESSAGE_COLUMNS: &str =
    "id, sender_id, content, message_type, conversation_id, group_id, is_read, created_at";

/// PostgreSQL implementation of MessageRepository
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Read receipts for a batch of messages, keyed by message id
async fn load_reads(
    conn: &mut PgConnection,
    message_ids: &[i64],
) -> RepoResult<HashMap<i64, Vec<MessageReadModel>>> {
    if message_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, MessageReadModel>(
        r"
        SELECT message_id, reader_id, read_at
        FROM message_reads
        WHERE message_id = ANY($1)
        ",
    )
    .bind(message_ids)
    .fetch_all(conn)
    .await
    .map_err(map_db_error)?;

    let mut by_message: HashMap<i64, Vec<MessageReadModel>> = HashMap::new();
    for row in rows {
        by_message.entry(row.message_id).or_default().push(row);
    }
    Ok(by_message)
}

async fn find_in(conn: &mut PgConnection, id: Snowflake) -> RepoResult<Option<Message>> {
    let model = sqlx::query_as::<_, MessageModel>(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
    ))
    .bind(id.into_inner())
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_db_error)?;

    let Some(model) = model else {
        return Ok(None);
    };
    let mut reads = load_reads(conn, &[model.id]).await?;
    let reads = reads.remove(&model.id).unwrap_or_default();
    message_from_parts(model, reads).map(Some)
}

fn target_missing(target: MessageTarget) -> DomainError {
    match target {
        MessageTarget::Conversation(id) => conversation_not_found(id),
        MessageTarget::Group(id) => group_not_found(id),
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        find_in(&mut *conn, id).await
    }

    #[instrument(skip(self, message), fields(message_id = %message.id, sender_id = %message.sender_id))]
    async fn create_within_quota(
        &self,
        message: &Message,
        limit: Option<u32>,
        window_start: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Serializes sends per sender until commit, so count + insert is atomic
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(message.sender_id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        if let Some(limit) = limit {
            let used = sqlx::query_scalar::<_, i64>(
                r"
                SELECT COUNT(*) FROM messages
                WHERE sender_id = $1 AND created_at >= $2
                ",
            )
            .bind(message.sender_id.into_inner())
            .bind(window_start)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

            if used >= i64::from(limit) {
                debug!(used, limit, "daily quota exhausted");
                return Err(DomainError::QuotaExceeded { limit });
            }
        }

        let insert = MessageInsert::new(message);
        sqlx::query(
            r"
            INSERT INTO messages (id, sender_id, content, message_type, conversation_id, group_id, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)
            ",
        )
        .bind(insert.id)
        .bind(insert.sender_id)
        .bind(insert.content)
        .bind(insert.message_type)
        .bind(insert.conversation_id)
        .bind(insert.group_id)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_foreign_key_violation(e, || target_missing(message.target)))?;

        if let MessageTarget::Conversation(conversation_id) = message.target {
            sqlx::query(
                r"
                UPDATE conversations
                SET last_message_at = GREATEST(last_message_at, $2)
                WHERE id = $1
                ",
            )
            .bind(conversation_id.into_inner())
            .bind(message.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn count_since(&self, sender_id: Snowflake, since: DateTime<Utc>) -> RepoResult<u32> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM messages
            WHERE sender_id = $1 AND created_at >= $2
            ",
        )
        .bind(sender_id.into_inner())
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    #[instrument(skip(self))]
    async fn list(&self, target: MessageTarget, query: MessageQuery) -> RepoResult<Vec<Message>> {
        let (column, id) = match target {
            MessageTarget::Conversation(id) => ("conversation_id", id),
            MessageTarget::Group(id) => ("group_id", id),
        };

        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;

        let mut models = sqlx::query_as::<_, MessageModel>(&format!(
            r"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE {column} = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(id.into_inner())
        .bind(i64::from(query.limit))
        .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
        .fetch_all(&mut *conn)
        .await
        .map_err(map_db_error)?;

        // newest page, shown oldest first
        models.reverse();

        let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
        let mut reads = load_reads(&mut *conn, &ids).await?;

        models
            .into_iter()
            .map(|model| {
                let receipts = reads.remove(&model.id).unwrap_or_default();
                message_from_parts(model, receipts)
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn mark_read(
        &self,
        message_id: Snowflake,
        reader: Snowflake,
        at: DateTime<Utc>,
    ) -> RepoResult<Option<Message>> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM messages WHERE id = $1 FOR UPDATE")
            .bind(message_id.into_inner())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?;
        if exists.is_none() {
            return Ok(None);
        }

        sqlx::query(
            r"
            INSERT INTO message_reads (message_id, reader_id, read_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (message_id, reader_id) DO NOTHING
            ",
        )
        .bind(message_id.into_inner())
        .bind(reader.into_inner())
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_foreign_key_violation(e, || DomainError::UserNotFound(reader)))?;

        // Read once every participant other than the sender has a receipt
        sqlx::query(
            r"
            UPDATE messages m
            SET is_read = TRUE
            WHERE m.id = $1
              AND m.message_type = 'conversation'
              AND NOT m.is_read
              AND NOT EXISTS (
                  SELECT 1
                  FROM conversations c
                  CROSS JOIN LATERAL (VALUES (c.participant_1), (c.participant_2)) AS p(user_id)
                  WHERE c.id = m.conversation_id
                    AND p.user_id <> m.sender_id
                    AND NOT EXISTS (
                        SELECT 1 FROM message_reads r
                        WHERE r.message_id = m.id AND r.reader_id = p.user_id
                    )
              )
            ",
        )
        .bind(message_id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let message = find_in(&mut *tx, message_id).await?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(message)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(message_not_found(id));
        }

        Ok(())
    }
}
