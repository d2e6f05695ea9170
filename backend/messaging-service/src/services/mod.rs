pub mod content_filter;
pub mod directory;
pub mod identity;
pub mod message_store;
pub mod notifier;
