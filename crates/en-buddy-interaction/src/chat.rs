//! Streaming chat conversation state.
//!
//! [`MessageAssembler`] owns the message list of one chat session. Each
//! call to [`send_message`](MessageAssembler::send_message) appends the user
//! message, streams the reply into a single assistant message as it
//! arrives, and leaves the exchange settled however the stream ended.

use crate::stream_client::{StreamClient, StreamOutcome, TransportProfile};
use en_buddy_core::config::Endpoints;
use en_buddy_core::error::{EnBuddyError, Result};
use en_buddy_core::message::{Message, MessageId, MessageIdGenerator};
use en_buddy_core::session::{ChatSession, SessionFactory};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Shown when a reply could not be delivered.
pub const DIAGNOSTIC_MESSAGE: &str = "Sorry, something went wrong. Please try again.";

/// Appended to a reply that was stopped by cancellation or timeout.
pub const CANCELLED_MARKER: &str = "[cancelled]";

/// Lifecycle of the current exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    /// User message appended, no reply payload yet.
    Sending,
    /// Reply payloads are being appended.
    Streaming,
    Settled,
}

/// How a started exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Completed,
    /// The body broke off; the reply carries the diagnostic suffix.
    Interrupted(String),
    Cancelled,
    TimedOut,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    session_id: &'a str,
    message: &'a str,
}

pub struct MessageAssembler {
    client: StreamClient,
    chat_path: String,
    memory_path: String,
    sessions: Arc<dyn SessionFactory>,
    session: ChatSession,
    ids: MessageIdGenerator,
    state: ChatState,
    /// Assistant message receiving the in-flight reply.
    reply: Option<MessageId>,
    snapshots: watch::Sender<Vec<Message>>,
}

impl MessageAssembler {
    pub fn new(client: StreamClient, endpoints: &Endpoints, sessions: Arc<dyn SessionFactory>) -> Self {
        let session = ChatSession::new(sessions.new_session_id());
        let (snapshots, _) = watch::channel(Vec::new());

        Self {
            client,
            chat_path: endpoints.chat_stream.clone(),
            memory_path: endpoints.chat_memory.clone(),
            sessions,
            session,
            ids: MessageIdGenerator::new(),
            state: ChatState::Idle,
            reply: None,
            snapshots,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.session.messages
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    /// Receives a snapshot of the message list after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.snapshots.subscribe()
    }

    /// Sends `content` and streams the reply into the message list.
    ///
    /// Returns `Ok` once a stream was started, whatever its end. Blank
    /// content is rejected before any request. When the request itself
    /// fails (bad status, unreachable backend) the diagnostic message is
    /// still added to the list and the error is returned.
    pub async fn send_message(&mut self, content: &str, cancel: &CancellationToken) -> Result<ChatOutcome> {
        if content.trim().is_empty() {
            return Err(EnBuddyError::validation("message content is empty"));
        }

        self.settle_orphaned_exchange();

        let user_id = self.ids.next_id();
        self.session.messages.push(Message::user(user_id, content));
        self.reply = None;
        self.state = ChatState::Sending;
        self.publish();
        tracing::info!(session_id = %self.session.session_id, "Chat message sent");

        let session_id = self.session.session_id.clone();
        let request = ChatRequest {
            session_id: &session_id,
            message: content,
        };

        let messages = &mut self.session.messages;
        let ids = &mut self.ids;
        let state = &mut self.state;
        let reply = &mut self.reply;
        let snapshots = &self.snapshots;

        let result = self
            .client
            .stream(
                &self.chat_path,
                &request,
                TransportProfile::CHAT,
                |payload| match *reply {
                    None => {
                        let id = ids.next_id();
                        let message = Message::assistant(id, payload);
                        snapshots.send_modify(|snapshot| snapshot.push(message.clone()));
                        messages.push(message);
                        *reply = Some(id);
                        *state = ChatState::Streaming;
                    }
                    Some(id) => {
                        if let Some(message) = messages.iter_mut().rev().find(|m| m.id == id) {
                            message.content.push_str(payload);
                        }
                        snapshots.send_modify(|snapshot| {
                            if let Some(message) = snapshot.iter_mut().rev().find(|m| m.id == id) {
                                message.content.push_str(payload);
                            }
                        });
                    }
                },
                cancel,
            )
            .await;

        let outcome = match result {
            Ok(StreamOutcome::Completed) => ChatOutcome::Completed,
            Ok(StreamOutcome::Cancelled) => {
                self.append_notice(CANCELLED_MARKER);
                ChatOutcome::Cancelled
            }
            Ok(StreamOutcome::TimedOut) => {
                self.append_notice(CANCELLED_MARKER);
                ChatOutcome::TimedOut
            }
            Err(e) if e.is_mid_stream() => {
                tracing::warn!(error = %e, "Chat reply interrupted");
                self.append_notice(DIAGNOSTIC_MESSAGE);
                ChatOutcome::Interrupted(e.to_string())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Chat request failed");
                self.append_notice(DIAGNOSTIC_MESSAGE);
                self.settle();
                return Err(e);
            }
        };

        self.settle();
        tracing::info!(outcome = ?outcome, "Chat exchange settled");
        Ok(outcome)
    }

    /// Clears the server-side memory of this session, then the local
    /// history. Local history is kept when the request fails.
    pub async fn clear_memory(&mut self) -> Result<()> {
        let path = format!(
            "{}/{}",
            self.memory_path.trim_end_matches('/'),
            self.session.session_id
        );

        if let Err(e) = self.client.transport().delete(&path).await {
            tracing::warn!(error = %e, "Failed to clear chat memory");
            return Err(e);
        }

        self.session.messages.clear();
        self.reply = None;
        self.state = ChatState::Idle;
        self.publish();
        tracing::info!(session_id = %self.session.session_id, "Chat memory cleared");
        Ok(())
    }

    /// Starts over with a fresh session id and an empty history.
    pub fn new_session(&mut self) {
        self.session = ChatSession::new(self.sessions.new_session_id());
        self.reply = None;
        self.state = ChatState::Idle;
        self.publish();
        tracing::info!(session_id = %self.session.session_id, "New chat session");
    }

    /// Settles an exchange whose future was dropped mid-stream.
    fn settle_orphaned_exchange(&mut self) {
        if matches!(self.state, ChatState::Sending | ChatState::Streaming) {
            tracing::warn!(state = ?self.state, "Settling abandoned chat exchange");
            self.append_notice(CANCELLED_MARKER);
            self.settle();
        }
    }

    /// Appends `notice` to the in-flight reply, or adds it as the reply
    /// when none has started.
    fn append_notice(&mut self, notice: &str) {
        let existing = self.reply.and_then(|id| self.session.message_mut(id));
        match existing {
            Some(message) => {
                message.content.push_str("\n\n");
                message.content.push_str(notice);
            }
            None => {
                let id = self.ids.next_id();
                self.session.messages.push(Message::assistant(id, notice));
                self.reply = Some(id);
            }
        }
    }

    fn settle(&mut self) {
        self.state = ChatState::Settled;
        self.reply = None;
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.messages.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Reply, ScriptedTransport, Step};
    use en_buddy_core::message::MessageRole;
    use en_buddy_core::session::FixedSessionFactory;
    use std::time::Duration;

    fn assembler(transport: Arc<ScriptedTransport>) -> MessageAssembler {
        let client = StreamClient::new(transport, Some(Duration::from_millis(200)));
        MessageAssembler::new(
            client,
            &Endpoints::default(),
            Arc::new(FixedSessionFactory("session-1".to_string())),
        )
    }

    fn contents(assembler: &MessageAssembler) -> Vec<(MessageRole, String)> {
        assembler
            .messages()
            .iter()
            .map(|m| (m.role, m.content.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_reply_assembled_into_one_message() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::ok(vec![
            Step::text("data:He\n"),
            Step::text("data:llo!\n"),
        ])]));
        let mut chat = assembler(transport.clone());

        let outcome = chat.send_message("hi", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome, ChatOutcome::Completed);
        assert_eq!(
            contents(&chat),
            vec![
                (MessageRole::User, "hi".to_string()),
                (MessageRole::Assistant, "Hello!".to_string()),
            ]
        );
        assert_ne!(chat.messages()[0].id, chat.messages()[1].id);
        assert_eq!(chat.state(), ChatState::Settled);

        let (path, body) = &transport.opened()[0];
        assert_eq!(path, "/api/chat/stream");
        assert_eq!(body["sessionId"], "session-1");
        assert_eq!(body["message"], "hi");
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected_without_request() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let mut chat = assembler(transport.clone());

        let err = chat.send_message("  \n", &CancellationToken::new()).await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(transport.open_count(), 0);
        assert!(chat.messages().is_empty());
        assert_eq!(chat.state(), ChatState::Idle);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_partial_reply() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::ok(vec![
            Step::text("data:Par\n"),
            Step::Fail("reset".into()),
        ])]));
        let mut chat = assembler(transport);

        let outcome = chat.send_message("hi", &CancellationToken::new()).await.unwrap();

        assert!(matches!(outcome, ChatOutcome::Interrupted(_)));
        assert_eq!(chat.messages().len(), 2);
        let reply = &chat.messages()[1].content;
        assert!(reply.starts_with("Par"));
        assert!(reply.ends_with(DIAGNOSTIC_MESSAGE));
    }

    #[tokio::test]
    async fn test_http_error_adds_diagnostic_and_returns_err() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::status(500, "")]));
        let mut chat = assembler(transport);

        let err = chat.send_message("hi", &CancellationToken::new()).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(
            contents(&chat),
            vec![
                (MessageRole::User, "hi".to_string()),
                (MessageRole::Assistant, DIAGNOSTIC_MESSAGE.to_string()),
            ]
        );
        assert_eq!(chat.state(), ChatState::Settled);
    }

    #[tokio::test]
    async fn test_cancel_settles_with_marker() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::ok(vec![
            Step::text("data:Hal\n"),
            Step::Stall,
        ])]));
        let client = StreamClient::new(transport, None);
        let mut chat = MessageAssembler::new(
            client,
            &Endpoints::default(),
            Arc::new(FixedSessionFactory("s".to_string())),
        );

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let outcome = chat.send_message("hi", &cancel).await.unwrap();

        assert_eq!(outcome, ChatOutcome::Cancelled);
        assert_eq!(chat.messages()[1].content, format!("Hal\n\n{CANCELLED_MARKER}"));
        assert_eq!(chat.state(), ChatState::Settled);
    }

    #[tokio::test]
    async fn test_timeout_settles_as_timed_out() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::ok(vec![Step::Stall])]));
        let mut chat = assembler(transport);

        let outcome = chat.send_message("hi", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome, ChatOutcome::TimedOut);
        assert_eq!(chat.messages()[1].content, CANCELLED_MARKER);
    }

    #[tokio::test]
    async fn test_dropped_future_is_settled_on_next_send() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Reply::ok(vec![Step::text("data:partial\n"), Step::Stall]),
            Reply::ok(vec![Step::text("data:fresh\n")]),
        ]));
        let client = StreamClient::new(transport, None);
        let mut chat = MessageAssembler::new(
            client,
            &Endpoints::default(),
            Arc::new(FixedSessionFactory("s".to_string())),
        );

        let abandoned = tokio::time::timeout(
            Duration::from_millis(30),
            chat.send_message("first", &CancellationToken::new()),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(chat.state(), ChatState::Streaming);

        chat.send_message("second", &CancellationToken::new()).await.unwrap();

        let texts: Vec<String> = chat.messages().iter().map(|m| m.content.clone()).collect();
        assert_eq!(
            texts,
            vec![
                "first".to_string(),
                format!("partial\n\n{CANCELLED_MARKER}"),
                "second".to_string(),
                "fresh".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_snapshots_follow_mutations() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::ok(vec![Step::text(
            "data:ok\n",
        )])]));
        let mut chat = assembler(transport);
        let snapshots = chat.subscribe();

        chat.send_message("hi", &CancellationToken::new()).await.unwrap();

        let latest = snapshots.borrow().clone();
        assert_eq!(latest, chat.messages().to_vec());
    }

    #[tokio::test]
    async fn test_snapshots_patch_reply_while_streaming() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::ok(vec![
            Step::text("data:He\n"),
            Step::text("data:llo\n"),
            Step::Stall,
        ])]));
        let client = StreamClient::new(transport, None);
        let mut chat = MessageAssembler::new(
            client,
            &Endpoints::default(),
            Arc::new(FixedSessionFactory("s".to_string())),
        );

        let mut snapshots = chat.subscribe();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let watcher = tokio::spawn(async move {
            let seen = snapshots
                .wait_for(|messages| messages.len() == 2 && messages[1].content == "Hello")
                .await
                .map(|messages| messages.clone());
            trigger.cancel();
            seen
        });

        let outcome = tokio::time::timeout(Duration::from_secs(2), chat.send_message("hi", &cancel))
            .await
            .expect("partial reply should reach subscribers")
            .unwrap();

        let seen = watcher.await.unwrap().unwrap();
        assert_eq!(seen[0].content, "hi");
        assert_eq!(seen[1].role, MessageRole::Assistant);
        assert_eq!(outcome, ChatOutcome::Cancelled);
        assert_eq!(*chat.subscribe().borrow(), chat.messages().to_vec());
    }

    #[tokio::test]
    async fn test_clear_memory_success_empties_history() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::ok(vec![Step::text(
            "data:ok\n",
        )])]));
        let mut chat = assembler(transport.clone());
        chat.send_message("hi", &CancellationToken::new()).await.unwrap();

        chat.clear_memory().await.unwrap();

        assert!(chat.messages().is_empty());
        assert_eq!(transport.deleted(), vec!["/api/chat/memory/session-1".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_memory_failure_keeps_history() {
        let transport = Arc::new(
            ScriptedTransport::new(vec![Reply::ok(vec![Step::text("data:ok\n")])])
                .with_delete_replies(vec![Err(EnBuddyError::http(500, "boom"))]),
        );
        let mut chat = assembler(transport);
        chat.send_message("hi", &CancellationToken::new()).await.unwrap();

        assert!(chat.clear_memory().await.is_err());
        assert_eq!(chat.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_new_session_resets() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::ok(vec![Step::text(
            "data:ok\n",
        )])]));
        let mut chat = assembler(transport);
        chat.send_message("hi", &CancellationToken::new()).await.unwrap();

        chat.new_session();

        assert!(chat.messages().is_empty());
        assert_eq!(chat.state(), ChatState::Idle);
        assert_eq!(chat.session_id(), "session-1");
    }
}
