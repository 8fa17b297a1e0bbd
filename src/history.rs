//! Chat and message types persisted by the chat store.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default = "now")]
    pub timestamp: DateTime<Local>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: now(),
        }
    }
}

/// A persisted conversation. Overwritten wholesale on every mutation;
/// messages are append-only, never edited or deleted.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Chat {
    pub id: String,
    pub name: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default = "now")]
    pub timestamp: DateTime<Local>,
}

impl Chat {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_chat_id(),
            name: name.into(),
            messages: Vec::new(),
            is_favorite: false,
            timestamp: now(),
        }
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) -> ChatMessage {
        let message = ChatMessage::new(role, content);
        self.messages.push(message.clone());
        message
    }
}

fn now() -> DateTime<Local> {
    Local::now()
}

/// Chat ids are derived from the creation instant, microsecond resolution,
/// bumped monotonically when two chats land in the same microsecond.
fn new_chat_id() -> String {
    static LAST: AtomicI64 = AtomicI64::new(0);
    let now = Utc::now().timestamp_micros();
    let prev = LAST.fetch_max(now, Ordering::Relaxed);
    let id = if prev >= now {
        LAST.fetch_add(1, Ordering::Relaxed) + 1
    } else {
        now
    };
    id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let message = ChatMessage::new(Role::User, "hello");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn consecutive_chats_get_distinct_ids() {
        let a = Chat::new("a");
        let b = Chat::new("b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn push_appends_in_order() {
        let mut chat = Chat::new("New Chat");
        chat.push(Role::User, "hello");
        chat.push(Role::Assistant, "hi there");
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, Role::User);
        assert_eq!(chat.messages[1].role, Role::Assistant);
    }
}
