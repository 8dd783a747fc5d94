//! HTTP plumbing behind the stream client.
//!
//! [`EventTransport`] is the seam between the streaming logic and the
//! network. [`HttpTransport`] is the reqwest implementation; tests script
//! their own.

use async_trait::async_trait;
use bytes::Bytes;
use en_buddy_core::config::{BackendConfig, StreamConfig};
use en_buddy_core::error::{EnBuddyError, Result};
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderValue};
use serde_json::Value as JsonValue;

/// Response body as a stream of raw chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// An opened streaming response. The status has not been checked yet.
pub struct StreamResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl StreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Reads the remaining body into a string, stopping at the first
    /// failed chunk.
    pub async fn text(mut self) -> String {
        let mut bytes = Vec::new();
        while let Some(Ok(chunk)) = self.body.next().await {
            bytes.extend_from_slice(&chunk);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl std::fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait EventTransport: Send + Sync {
    /// POSTs `body` as JSON to `path` and returns the response once the
    /// headers have arrived.
    ///
    /// Fails with [`EnBuddyError::Network`] when no response arrives. Body
    /// chunk failures surface inside the stream as
    /// [`EnBuddyError::StreamInterrupted`].
    async fn open(&self, path: &str, body: JsonValue) -> Result<StreamResponse>;

    /// Issues a DELETE on `path`. Any 2xx is success.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// reqwest-backed [`EventTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    backend: BackendConfig,
}

impl HttpTransport {
    pub fn new(backend: BackendConfig, stream: &StreamConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = stream.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| EnBuddyError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, backend })
    }

    pub fn backend(&self) -> &BackendConfig {
        &self.backend
    }
}

#[async_trait]
impl EventTransport for HttpTransport {
    async fn open(&self, path: &str, body: JsonValue) -> Result<StreamResponse> {
        let url = self.backend.url(path);
        tracing::debug!(url = %url, "Opening event stream");

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .json(&body)
            .send()
            .await
            .map_err(|e| EnBuddyError::network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| EnBuddyError::stream_interrupted(e.to_string())))
            .boxed();

        Ok(StreamResponse { status, body })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = self.backend.url(path);
        tracing::debug!(url = %url, "DELETE");

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| EnBuddyError::network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(crate::backend::map_http_error(status.as_u16(), &body))
    }
}
