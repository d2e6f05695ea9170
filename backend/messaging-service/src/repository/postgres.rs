use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{ConversationHead, MessageRepository};
use crate::error::StoreError;
use crate::models::Message;

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, receiver_id, listing_id, content, is_read, created_at";

#[derive(Clone)]
pub struct PgMessageRepository {
    db: Pool<Postgres>,
}

impl PgMessageRepository {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert(&self, message: &Message) -> Result<Message, StoreError> {
        let query = format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {MESSAGE_COLUMNS}"
        );
        let stored = sqlx::query_as::<_, Message>(&query)
            .bind(message.id)
            .bind(&message.conversation_id)
            .bind(message.sender_id)
            .bind(message.receiver_id)
            .bind(message.listing_id)
            .bind(&message.content)
            .bind(message.is_read)
            .bind(message.created_at)
            .fetch_one(&self.db)
            .await?;
        Ok(stored)
    }

    async fn page_by_conversation(
        &self,
        conversation_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Message>, i64), StoreError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::bigint FROM messages WHERE conversation_id = $1",
        )
        .bind(conversation_id)
        .fetch_one(&self.db)
        .await?;

        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE conversation_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        let messages = sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await?;

        Ok((messages, total))
    }

    async fn conversation_heads(&self, user_id: Uuid) -> Result<Vec<ConversationHead>, StoreError> {
        let heads = sqlx::query_as::<_, ConversationHead>(
            r#"
            WITH mine AS (
                SELECT id, conversation_id, sender_id, receiver_id, listing_id,
                       content, is_read, created_at
                FROM messages
                WHERE sender_id = $1 OR receiver_id = $1
            ),
            latest AS (
                SELECT DISTINCT ON (conversation_id) *
                FROM mine
                ORDER BY conversation_id, created_at DESC, id DESC
            ),
            unread AS (
                SELECT conversation_id, COUNT(*)::bigint AS unread_count
                FROM mine
                WHERE receiver_id = $1 AND is_read = FALSE
                GROUP BY conversation_id
            )
            SELECT l.id, l.conversation_id, l.sender_id, l.receiver_id, l.listing_id,
                   l.content, l.is_read, l.created_at,
                   COALESCE(u.unread_count, 0)::bigint AS unread_count
            FROM latest l
            LEFT JOIN unread u ON u.conversation_id = l.conversation_id
            ORDER BY l.created_at DESC, l.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(heads)
    }

    async fn mark_read(&self, message_ids: &[Uuid], user_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE \
             WHERE id = ANY($1) AND receiver_id = $2 AND is_read = FALSE",
        )
        .bind(message_ids)
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::bigint FROM messages WHERE receiver_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    async fn has_participant(&self, conversation_id: &str, user_id: Uuid) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM messages \
             WHERE conversation_id = $1 AND (sender_id = $2 OR receiver_id = $2))",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }
}
