use futures::future::join_all;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::StoreError;
use crate::metrics;
use crate::models::{
    derive_conversation_id, ConversationKey, ConversationSummary, ListingSummary, Message,
    MessagePage, MessageView, NewMessage, UserProfile,
};
use crate::repository::MessageRepository;
use crate::services::content_filter;
use crate::services::directory::{ListingLookup, ProfileLookup};

pub const MAX_MESSAGE_LENGTH: usize = 5000;
pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Durable message model plus the read-side views built on top of it.
#[derive(Clone)]
pub struct MessageStore {
    repo: Arc<dyn MessageRepository>,
    profiles: Arc<dyn ProfileLookup>,
    listings: Arc<dyn ListingLookup>,
}

impl MessageStore {
    pub fn new(
        repo: Arc<dyn MessageRepository>,
        profiles: Arc<dyn ProfileLookup>,
        listings: Arc<dyn ListingLookup>,
    ) -> Self {
        Self {
            repo,
            profiles,
            listings,
        }
    }

    /// Validate, filter and persist a message, returning it with display
    /// fields resolved.
    pub async fn create(&self, new: NewMessage) -> Result<MessageView, StoreError> {
        if new.content.trim().is_empty() {
            return Err(StoreError::Validation("content is required".into()));
        }
        if new.content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(StoreError::Validation(format!(
                "content exceeds {MAX_MESSAGE_LENGTH} characters"
            )));
        }
        if new.sender_id.is_nil() || new.receiver_id.is_nil() || new.listing_id.is_nil() {
            return Err(StoreError::Validation(
                "senderId, receiverId and listingId are required".into(),
            ));
        }
        if new.sender_id == new.receiver_id {
            return Err(StoreError::Validation("cannot send a message to yourself".into()));
        }

        let conversation_id = derive_conversation_id(new.sender_id, new.receiver_id, new.listing_id);
        if let Some(supplied) = new.conversation_id.as_deref() {
            if supplied != conversation_id {
                return Err(StoreError::Validation(
                    "conversationId does not match participants and listing".into(),
                ));
            }
        }

        // The recipient must exist at send time. Later lookups degrade to null.
        if self.profiles.display_fields(new.receiver_id).await?.is_none() {
            warn!(receiver_id = %new.receiver_id, "message addressed to unknown user");
            return Err(StoreError::UserNotFound(new.receiver_id));
        }

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            listing_id: new.listing_id,
            content: content_filter::filter(&new.content),
            is_read: false,
            created_at: chrono::Utc::now(),
        };

        let stored = self.repo.insert(&message).await?;
        metrics::record_message_persisted();
        tracing::debug!(
            message_id = %stored.id,
            conversation_id = %stored.conversation_id,
            "message persisted"
        );

        Ok(self.resolve(stored).await)
    }

    pub async fn list_by_conversation(
        &self,
        conversation_id: &str,
        page: i64,
        page_size: i64,
    ) -> Result<MessagePage, StoreError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(page_size);

        let (messages, total) = self
            .repo
            .page_by_conversation(conversation_id, page_size, offset)
            .await?;

        Ok(MessagePage {
            messages,
            total,
            page,
            page_size,
        })
    }

    /// The user's inbox: one summary per conversation, most recently active
    /// first.
    pub async fn list_conversations_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        let heads = self.repo.conversation_heads(user_id).await?;

        let summaries = heads.into_iter().map(|head| async move {
            let last = head.last_message;
            let other_user_id = if last.sender_id == user_id {
                last.receiver_id
            } else {
                last.sender_id
            };
            let (other_user, listing) = tokio::join!(
                self.profile_or_none(other_user_id),
                self.listing_or_none(last.listing_id)
            );

            ConversationSummary {
                conversation_id: last.conversation_id.clone(),
                other_user_id,
                other_user,
                listing_id: last.listing_id,
                listing,
                updated_at: last.created_at,
                unread_count: head.unread_count,
                last_message: last,
            }
        });

        Ok(join_all(summaries).await)
    }

    /// Mark messages addressed to `user_id` as read. Ids that do not exist,
    /// are already read, or belong to someone else are ignored.
    pub async fn mark_read(&self, message_ids: &[Uuid], user_id: Uuid) -> Result<u64, StoreError> {
        let mut ids = message_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(0);
        }
        self.repo.mark_read(&ids, user_id).await
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, StoreError> {
        self.repo.unread_count(user_id).await
    }

    pub async fn is_participant(&self, conversation_id: &str, user_id: Uuid) -> Result<bool, StoreError> {
        match ConversationKey::parse(conversation_id) {
            Some(key) => Ok(key.involves(user_id)),
            None => self.repo.has_participant(conversation_id, user_id).await,
        }
    }

    pub async fn display_fields(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        self.profiles.display_fields(user_id).await
    }

    async fn resolve(&self, message: Message) -> MessageView {
        let (sender, receiver, listing) = tokio::join!(
            self.profile_or_none(message.sender_id),
            self.profile_or_none(message.receiver_id),
            self.listing_or_none(message.listing_id)
        );
        MessageView {
            message,
            sender,
            receiver,
            listing,
        }
    }

    async fn profile_or_none(&self, user_id: Uuid) -> Option<UserProfile> {
        match self.profiles.display_fields(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(%user_id, error = %e, "profile lookup failed");
                None
            }
        }
    }

    async fn listing_or_none(&self, listing_id: Uuid) -> Option<ListingSummary> {
        match self.listings.listing_summary(listing_id).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(%listing_id, error = %e, "listing lookup failed");
                None
            }
        }
    }
}
