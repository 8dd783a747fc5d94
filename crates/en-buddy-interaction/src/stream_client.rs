//! Streaming request execution.
//!
//! [`StreamClient`] opens a request through an [`EventTransport`], feeds the
//! body through a [`LineBufferedDecoder`] and an [`EventExtractor`], and
//! hands each accepted payload to a callback in line order.

use crate::decoder::LineBufferedDecoder;
use crate::extractor::{EventExtractor, PayloadSemantics};
use crate::transport::{ByteStream, EventTransport, StreamResponse};
use bytes::Bytes;
use en_buddy_core::error::{EnBuddyError, Result};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a non-success response body is turned into an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorBodyPolicy {
    /// The body is not read.
    StatusOnly,
    /// The body is read once; its JSON `error` string is the message.
    JsonErrorField,
}

/// Per-endpoint framing and error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportProfile {
    pub semantics: PayloadSemantics,
    pub error_body: ErrorBodyPolicy,
}

impl TransportProfile {
    /// Chat endpoint: raw chunks, status-only errors.
    pub const CHAT: Self = Self {
        semantics: PayloadSemantics::RawChunk,
        error_body: ErrorBodyPolicy::StatusOnly,
    };

    /// Coach endpoint: newline-preserving payloads, JSON error bodies.
    pub const COACH: Self = Self {
        semantics: PayloadSemantics::NewlinePreserving,
        error_body: ErrorBodyPolicy::JsonErrorField,
    };
}

/// How a stream that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Cancelled,
    TimedOut,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Fallback message for a non-success status.
pub fn status_message(status: u16) -> String {
    format!("HTTP error! status: {status}")
}

/// Message for a non-success status under [`ErrorBodyPolicy::JsonErrorField`].
pub fn json_error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| status_message(status))
}

enum Pull {
    Chunk(Bytes),
    End,
    Failed(EnBuddyError),
    TimedOut,
}

async fn pull(body: &mut ByteStream, read_timeout: Option<Duration>) -> Pull {
    let Some(next) = within(read_timeout, body.next()).await else {
        return Pull::TimedOut;
    };

    match next {
        Some(Ok(chunk)) => Pull::Chunk(chunk),
        Some(Err(e)) => Pull::Failed(e),
        None => Pull::End,
    }
}

#[derive(Clone)]
pub struct StreamClient {
    transport: Arc<dyn EventTransport>,
    read_timeout: Option<Duration>,
}

impl StreamClient {
    pub fn new(transport: Arc<dyn EventTransport>, read_timeout: Option<Duration>) -> Self {
        Self {
            transport,
            read_timeout,
        }
    }

    pub fn transport(&self) -> &Arc<dyn EventTransport> {
        &self.transport
    }

    /// Runs one streaming request to its end.
    ///
    /// `on_event` is called synchronously once per accepted payload, in
    /// line order, and never after cancellation or timeout.
    ///
    /// # Errors
    ///
    /// - [`EnBuddyError::Network`] when no response arrives (no callbacks)
    /// - [`EnBuddyError::Http`] for a non-success status (no callbacks)
    /// - [`EnBuddyError::StreamInterrupted`] when the body breaks off, after
    ///   zero or more callbacks
    pub async fn stream<B, F>(
        &self,
        path: &str,
        body: &B,
        profile: TransportProfile,
        mut on_event: F,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome>
    where
        B: Serialize + ?Sized,
        F: FnMut(&str),
    {
        let body = serde_json::to_value(body)?;

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(path, "Stream cancelled before response");
                return Ok(StreamOutcome::Cancelled);
            }
            opened = self.open_with_timeout(path, body) => opened,
        };
        let Some(response) = opened? else {
            tracing::debug!(path, "Timed out waiting for response");
            return Ok(StreamOutcome::TimedOut);
        };

        if !response.is_success() {
            let status = response.status;
            let message = match profile.error_body {
                ErrorBodyPolicy::StatusOnly => status_message(status),
                ErrorBodyPolicy::JsonErrorField => {
                    let read = within(self.read_timeout, response.text());
                    let text = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            tracing::debug!(path, status, "Stream cancelled while reading error body");
                            return Ok(StreamOutcome::Cancelled);
                        }
                        text = read => text,
                    };
                    match text {
                        Some(body) => json_error_message(status, &body),
                        None => {
                            tracing::debug!(path, status, "Timed out reading error body");
                            status_message(status)
                        }
                    }
                }
            };
            tracing::debug!(path, status, "Stream request rejected");
            return Err(EnBuddyError::http(status, message));
        }

        let mut decoder = LineBufferedDecoder::new();
        let extractor = EventExtractor::new(profile.semantics);
        let mut body = response.body;
        let mut events = 0usize;

        loop {
            let pulled = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(path, events, "Stream cancelled");
                    return Ok(StreamOutcome::Cancelled);
                }
                pulled = pull(&mut body, self.read_timeout) => pulled,
            };

            match pulled {
                Pull::Chunk(chunk) => {
                    for line in decoder.push(&chunk) {
                        if let Some(payload) = extractor.extract(&line) {
                            events += 1;
                            on_event(payload);
                        }
                    }
                }
                Pull::End => break,
                Pull::Failed(e) => {
                    tracing::debug!(path, events, error = %e, "Stream interrupted");
                    return Err(match e {
                        EnBuddyError::StreamInterrupted(_) => e,
                        other => EnBuddyError::stream_interrupted(other.to_string()),
                    });
                }
                Pull::TimedOut => {
                    tracing::debug!(path, events, "Stream read timed out");
                    return Ok(StreamOutcome::TimedOut);
                }
            }
        }

        if let Some(rest) = decoder.finish() {
            if let Some(payload) = extractor.extract(&rest) {
                events += 1;
                on_event(payload);
            }
        }

        tracing::debug!(path, events, "Stream completed");
        Ok(StreamOutcome::Completed)
    }

    async fn open_with_timeout(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<Option<StreamResponse>> {
        within(self.read_timeout, self.transport.open(path, body))
            .await
            .transpose()
    }
}

/// Runs `fut` to completion, or returns `None` once `limit` elapses.
async fn within<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}
