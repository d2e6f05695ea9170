//! Read-only lookups into user and listing records owned by other services.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{ListingSummary, UserProfile};

#[async_trait]
pub trait ProfileLookup: Send + Sync {
    /// Display fields of a user, or `None` if no such user exists.
    async fn display_fields(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError>;
}

#[async_trait]
pub trait ListingLookup: Send + Sync {
    /// Summary of a listing, or `None` if it was deleted.
    async fn listing_summary(&self, listing_id: Uuid) -> Result<Option<ListingSummary>, StoreError>;
}

/// Lookups against the shared marketplace database.
#[derive(Clone)]
pub struct PgDirectory {
    db: Pool<Postgres>,
}

impl PgDirectory {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileLookup for PgDirectory {
    async fn display_fields(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let profile = sqlx::query_as::<_, UserProfile>(
            "SELECT id, first_name, last_name, avatar FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(profile)
    }
}

#[async_trait]
impl ListingLookup for PgDirectory {
    async fn listing_summary(&self, listing_id: Uuid) -> Result<Option<ListingSummary>, StoreError> {
        let listing = sqlx::query_as::<_, ListingSummary>(
            "SELECT id, title FROM listings WHERE id = $1",
        )
        .bind(listing_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(listing)
    }
}

#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<Uuid, UserProfile>>,
    listings: RwLock<HashMap<Uuid, ListingSummary>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, profile: UserProfile) {
        self.users.write().await.insert(profile.id, profile);
    }

    pub async fn add_listing(&self, listing: ListingSummary) {
        self.listings.write().await.insert(listing.id, listing);
    }

    pub async fn remove_listing(&self, listing_id: Uuid) -> Option<ListingSummary> {
        self.listings.write().await.remove(&listing_id)
    }
}

#[async_trait]
impl ProfileLookup for InMemoryDirectory {
    async fn display_fields(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }
}

#[async_trait]
impl ListingLookup for InMemoryDirectory {
    async fn listing_summary(&self, listing_id: Uuid) -> Result<Option<ListingSummary>, StoreError> {
        Ok(self.listings.read().await.get(&listing_id).cloned())
    }
}
