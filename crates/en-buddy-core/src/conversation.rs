//! Server-side conversation listing models.

use serde::{Deserialize, Serialize};

use crate::message::MessageRole;

/// Title shown for conversations that were never named.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Chat";

/// One entry of the conversation sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ConversationSummary {
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => DEFAULT_CONVERSATION_TITLE,
        }
    }
}

/// A stored message of a server-side conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    #[serde(default)]
    pub id: Option<i64>,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Conversation list response. The backend may answer with a bare array or
/// with a page object whose items sit under `content`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ConversationPage {
    List(Vec<ConversationSummary>),
    Page { content: Vec<ConversationSummary> },
}

impl ConversationPage {
    pub fn into_items(self) -> Vec<ConversationSummary> {
        match self {
            ConversationPage::List(items) => items,
            ConversationPage::Page { content } => content,
        }
    }
}
