//! Scripted transport for exercising the stream client and assemblers
//! without a network.

use crate::transport::{EventTransport, StreamResponse};
use async_trait::async_trait;
use bytes::Bytes;
use en_buddy_core::error::{EnBuddyError, Result};
use futures::StreamExt;
use futures::stream;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One body event of a scripted response.
#[derive(Debug, Clone)]
pub enum Step {
    Chunk(Vec<u8>),
    Fail(String),
    /// Never yields another chunk.
    Stall,
}

impl Step {
    pub fn text(s: &str) -> Self {
        Step::Chunk(s.as_bytes().to_vec())
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Stream { status: u16, steps: Vec<Step> },
    Unreachable(String),
}

impl Reply {
    pub fn ok(steps: Vec<Step>) -> Self {
        Reply::Stream { status: 200, steps }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Reply::Stream {
            status,
            steps: vec![Step::text(body)],
        }
    }
}

/// Replays queued replies in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    delete_replies: Mutex<VecDeque<Result<()>>>,
    opened: Mutex<Vec<(String, JsonValue)>>,
    deleted: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    pub fn with_delete_replies(self, replies: Vec<Result<()>>) -> Self {
        *self.delete_replies.lock().unwrap() = replies.into();
        self
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn opened(&self) -> Vec<(String, JsonValue)> {
        self.opened.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventTransport for ScriptedTransport {
    async fn open(&self, path: &str, body: JsonValue) -> Result<StreamResponse> {
        self.opened.lock().unwrap().push((path.to_string(), body));

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Unreachable("no scripted reply".to_string()));

        match reply {
            Reply::Unreachable(message) => Err(EnBuddyError::network(message)),
            Reply::Stream { status, steps } => {
                let stalls = steps.iter().any(|s| matches!(s, Step::Stall));
                let items: Vec<Result<Bytes>> = steps
                    .into_iter()
                    .take_while(|s| !matches!(s, Step::Stall))
                    .map(|s| match s {
                        Step::Chunk(bytes) => Ok(Bytes::from(bytes)),
                        Step::Fail(message) => Err(EnBuddyError::stream_interrupted(message)),
                        Step::Stall => unreachable!(),
                    })
                    .collect();

                let head = stream::iter(items);
                let body = if stalls {
                    head.chain(stream::pending()).boxed()
                } else {
                    head.boxed()
                };
                Ok(StreamResponse { status, body })
            }
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(path.to_string());
        self.delete_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}
