use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ConversationHead, MessageRepository};
use crate::error::StoreError;
use crate::models::Message;

/// Process-local message storage. Insertion order breaks `created_at` ties,
/// later inserts sorting as newer.
#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<Message>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }

    pub async fn get(&self, id: Uuid) -> Option<Message> {
        self.messages.read().await.iter().find(|m| m.id == id).cloned()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn insert(&self, message: &Message) -> Result<Message, StoreError> {
        let mut messages = self.messages.write().await;
        if messages.iter().any(|m| m.id == message.id) {
            return Err(StoreError::Persistence(format!(
                "duplicate message id {}",
                message.id
            )));
        }
        messages.push(message.clone());
        Ok(message.clone())
    }

    async fn page_by_conversation(
        &self,
        conversation_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Message>, i64), StoreError> {
        let messages = self.messages.read().await;
        let mut matching: Vec<(usize, &Message)> = messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.conversation_id == conversation_id)
            .collect();
        let total = matching.len() as i64;

        matching.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|(_, m)| m.clone())
            .collect();

        Ok((page, total))
    }

    async fn conversation_heads(&self, user_id: Uuid) -> Result<Vec<ConversationHead>, StoreError> {
        let messages = self.messages.read().await;
        let mut heads: HashMap<&str, (usize, ConversationHead)> = HashMap::new();

        for (idx, message) in messages.iter().enumerate() {
            if message.sender_id != user_id && message.receiver_id != user_id {
                continue;
            }
            let unread = i64::from(message.receiver_id == user_id && !message.is_read);

            heads
                .entry(message.conversation_id.as_str())
                .and_modify(|(head_idx, head)| {
                    head.unread_count += unread;
                    if message.created_at >= head.last_message.created_at {
                        *head_idx = idx;
                        head.last_message = message.clone();
                    }
                })
                .or_insert_with(|| {
                    (
                        idx,
                        ConversationHead {
                            last_message: message.clone(),
                            unread_count: unread,
                        },
                    )
                });
        }

        let mut heads: Vec<(usize, ConversationHead)> = heads.into_values().collect();
        heads.sort_by(|(ia, a), (ib, b)| {
            b.last_message
                .created_at
                .cmp(&a.last_message.created_at)
                .then(ib.cmp(ia))
        });
        Ok(heads.into_iter().map(|(_, head)| head).collect())
    }

    async fn mark_read(&self, message_ids: &[Uuid], user_id: Uuid) -> Result<u64, StoreError> {
        let mut messages = self.messages.write().await;
        let mut updated = 0;
        for message in messages.iter_mut() {
            if !message.is_read && message.receiver_id == user_id && message_ids.contains(&message.id) {
                message.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .filter(|m| m.receiver_id == user_id && !m.is_read)
            .count() as i64)
    }

    async fn has_participant(&self, conversation_id: &str, user_id: Uuid) -> Result<bool, StoreError> {
        let messages = self.messages.read().await;
        Ok(messages.iter().any(|m| {
            m.conversation_id == conversation_id && (m.sender_id == user_id || m.receiver_id == user_id)
        }))
    }
}
