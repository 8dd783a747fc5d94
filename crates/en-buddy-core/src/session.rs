//! Chat session domain model.
//!
//! A session groups the ordered messages of one conversation under an id
//! that the backend uses to key its conversation memory.

use crate::message::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One chat conversation as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Key for server-side conversation memory. Stable until a new
    /// session is explicitly created.
    pub session_id: String,
    /// Messages in insertion order.
    pub messages: Vec<Message>,
}

impl ChatSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
        }
    }

    /// Returns the message with the given id, if present.
    pub fn message_mut(&mut self, id: crate::message::MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }
}

/// Produces identifiers for new chat sessions.
pub trait SessionFactory: Send + Sync {
    fn new_session_id(&self) -> String;
}

/// Session factory backed by random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidSessionFactory;

impl SessionFactory for UuidSessionFactory {
    fn new_session_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Session factory that always returns the same id. Useful for reattaching
/// to a known server-side conversation.
#[derive(Debug, Clone)]
pub struct FixedSessionFactory(pub String);

impl SessionFactory for FixedSessionFactory {
    fn new_session_id(&self) -> String {
        self.0.clone()
    }
}
