//! Live-event frames. Every frame on the socket is `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::models::{MessageView, UserProfile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinConversation(JoinConversation),
    NewMessage(NewMessagePayload),
    Typing(ConversationRef),
    StopTyping(ConversationRef),
    MessageRead(MessageReadPayload),
}

/// Clients send either the bare id or `{"conversationId": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JoinConversation {
    Id(String),
    Ref(ConversationRef),
}

impl JoinConversation {
    pub fn conversation_id(&self) -> &str {
        match self {
            JoinConversation::Id(id) => id,
            JoinConversation::Ref(r) => &r.conversation_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRef {
    pub conversation_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessagePayload {
    pub conversation_id: String,
    pub content: String,
    pub listing_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReadPayload {
    pub message_ids: Vec<Uuid>,
    pub conversation_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    NewMessage(MessageView),
    Typing(TypingNotice),
    StopTyping(TypingNotice),
    MessageRead(ReadReceipt),
    Error(ErrorNotice),
}

impl ServerEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerEvent::NewMessage(_) => "new_message",
            ServerEvent::Typing(_) => "typing",
            ServerEvent::StopTyping(_) => "stop_typing",
            ServerEvent::MessageRead(_) => "message_read",
            ServerEvent::Error(_) => "error",
        }
    }

    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

impl From<&UserProfile> for TypingUser {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingNotice {
    pub user_id: Uuid,
    pub conversation_id: String,
    pub user: TypingUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub message_ids: Vec<Uuid>,
    pub read_by: Uuid,
    pub conversation_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub message: String,
    pub code: String,
}

impl From<&GatewayError> for ErrorNotice {
    fn from(err: &GatewayError) -> Self {
        Self {
            message: err.to_string(),
            code: err.code().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_accepts_bare_id_and_object() {
        let bare: ClientEvent =
            serde_json::from_value(json!({"event": "join_conversation", "data": "a_b_c"})).unwrap();
        let object: ClientEvent = serde_json::from_value(
            json!({"event": "join_conversation", "data": {"conversationId": "a_b_c"}}),
        )
        .unwrap();

        for event in [bare, object] {
            match event {
                ClientEvent::JoinConversation(join) => assert_eq!(join.conversation_id(), "a_b_c"),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[test]
    fn test_new_message_requires_all_fields() {
        let missing_listing = json!({
            "event": "new_message",
            "data": {"conversationId": "x", "content": "Hi"}
        });
        assert!(serde_json::from_value::<ClientEvent>(missing_listing).is_err());
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"shutdown","data":{}}"#).is_err());
    }

    #[test]
    fn test_error_frame_shape() {
        let err = GatewayError::AuthorizationDenied("Access denied to conversation".into());
        let frame = ServerEvent::Error(ErrorNotice::from(&err)).to_frame().unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(value["event"], "error");
        assert_eq!(value["data"]["message"], "Access denied to conversation");
        assert_eq!(value["data"]["code"], "AUTHORIZATION_DENIED");
    }

    #[test]
    fn test_read_receipt_is_camel_case() {
        let id = Uuid::new_v4();
        let event = ServerEvent::MessageRead(ReadReceipt {
            message_ids: vec![id],
            read_by: id,
            conversation_id: "c".into(),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "message_read");
        assert_eq!(value["data"]["readBy"], id.to_string());
        assert!(value["data"]["messageIds"].is_array());
    }
}
