//! Out-of-band notifications for recipients who are not watching a conversation.
//!
//! Delivery is fire-and-forget: `notify` never reports failure to the caller,
//! it only logs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::MessageView;

const PREVIEW_MAX_CHARS: usize = 100;
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub conversation_id: String,
    pub message_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: Option<String>,
    pub listing_title: Option<String>,
    pub preview: String,
}

impl NotificationEvent {
    pub fn new_message(view: &MessageView) -> Self {
        Self {
            kind: NotificationKind::NewMessage,
            conversation_id: view.message.conversation_id.clone(),
            message_id: view.message.id,
            sender_id: view.message.sender_id,
            sender_name: view
                .sender
                .as_ref()
                .map(|s| format!("{} {}", s.first_name, s.last_name).trim().to_string()),
            listing_title: view.listing.as_ref().map(|l| l.title.clone()),
            preview: truncate_preview(&view.message.content),
        }
    }
}

fn truncate_preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_MAX_CHARS {
        return content.to_string();
    }
    let mut preview: String = content.chars().take(PREVIEW_MAX_CHARS).collect();
    preview.push_str("...");
    preview
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: Uuid, event: NotificationEvent);
}

/// Used when no delivery endpoint is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: Uuid, event: NotificationEvent) {
        info!(
            %user_id,
            conversation_id = %event.conversation_id,
            message_id = %event.message_id,
            "offline notification (no delivery endpoint configured)"
        );
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload<'a> {
    user_id: Uuid,
    event: &'a NotificationEvent,
}

/// POSTs each notification as JSON to a push/e-mail relay.
#[derive(Clone)]
pub struct WebhookNotifier {
    endpoint: String,
    http_client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            http_client,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, user_id: Uuid, event: NotificationEvent) {
        let payload = WebhookPayload {
            user_id,
            event: &event,
        };
        match self.http_client.post(&self.endpoint).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(%user_id, message_id = %event.message_id, "notification delivered");
            }
            Ok(response) => {
                warn!(
                    %user_id,
                    status = %response.status(),
                    "notification endpoint rejected event"
                );
            }
            Err(e) => {
                warn!(%user_id, error = %e, "notification delivery failed");
            }
        }
    }
}
