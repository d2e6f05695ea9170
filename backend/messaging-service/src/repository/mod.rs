//! Storage backends for messages.
//!
//! The store talks to storage only through [`MessageRepository`], so the
//! Postgres backend used in production and the in-memory backend used by
//! tests are interchangeable.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::Message;

pub use memory::InMemoryMessageRepository;
pub use postgres::PgMessageRepository;

/// Latest message of one conversation plus how many messages in it the
/// requesting user has not read yet.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ConversationHead {
    #[sqlx(flatten)]
    pub last_message: Message,
    pub unread_count: i64,
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, message: &Message) -> Result<Message, StoreError>;

    /// Messages of one conversation, newest first, plus the conversation total.
    async fn page_by_conversation(
        &self,
        conversation_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Message>, i64), StoreError>;

    /// One head per conversation the user has sent or received in, most
    /// recently active first.
    async fn conversation_heads(&self, user_id: Uuid) -> Result<Vec<ConversationHead>, StoreError>;

    /// Flip `is_read` on the given messages where `user_id` is the receiver.
    /// Returns how many messages changed state.
    async fn mark_read(&self, message_ids: &[Uuid], user_id: Uuid) -> Result<u64, StoreError>;

    async fn unread_count(&self, user_id: Uuid) -> Result<i64, StoreError>;

    /// Whether `user_id` sent or received any message in the conversation.
    async fn has_participant(&self, conversation_id: &str, user_id: Uuid) -> Result<bool, StoreError>;
}
