use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted message. Append-only: the only field that ever changes after
/// insert is `is_read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: String,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub listing_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Input to `MessageStore::create`.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub listing_id: Uuid,
    pub content: String,
    /// Optional; when present it must equal the derived id.
    pub conversation_id: Option<String>,
}

/// Public display fields of a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub id: Uuid,
    pub title: String,
}

/// A message with sender, receiver and listing resolved for display.
///
/// A `None` listing means the listing no longer exists; the message itself
/// stays valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub sender: Option<UserProfile>,
    pub receiver: Option<UserProfile>,
    pub listing: Option<ListingSummary>,
}

/// One page of a conversation, newest first.
#[derive(Debug, Clone)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl MessagePage {
    pub fn total_pages(&self) -> i64 {
        if self.page_size <= 0 {
            return 0;
        }
        (self.total + self.page_size - 1) / self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(total: i64, page_size: i64) -> MessagePage {
        MessagePage {
            messages: Vec::new(),
            total,
            page: 1,
            page_size,
        }
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(page(0, 50).total_pages(), 0);
        assert_eq!(page(1, 50).total_pages(), 1);
        assert_eq!(page(50, 50).total_pages(), 1);
        assert_eq!(page(51, 50).total_pages(), 2);
    }

    #[test]
    fn test_message_view_serializes_flat_camel_case() {
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: "c".into(),
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            listing_id: Uuid::new_v4(),
            content: "Hi".into(),
            is_read: false,
            created_at: Utc::now(),
        };
        let view = MessageView {
            message,
            sender: None,
            receiver: None,
            listing: None,
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["content"], "Hi");
        assert_eq!(json["isRead"], false);
        assert_eq!(json["conversationId"], "c");
        assert!(json["listing"].is_null());
    }
}
