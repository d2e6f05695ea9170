pub mod conversation;
pub mod message;

pub use conversation::{derive_conversation_id, ConversationKey, ConversationSummary};
pub use message::{ListingSummary, Message, MessagePage, MessageView, NewMessage, UserProfile};
