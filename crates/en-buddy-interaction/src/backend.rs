//! Typed client for the non-streaming backend endpoints.

use en_buddy_core::config::{BackendConfig, StreamConfig};
use en_buddy_core::conversation::{ConversationMessage, ConversationPage, ConversationSummary};
use en_buddy_core::error::{EnBuddyError, Result};
use en_buddy_core::translation::Translation;
use en_buddy_core::vocabulary::{CardExtraction, CardStatus, VocabularyCard};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    message: Option<String>,
}

/// Builds an [`EnBuddyError::Http`] from a failed response, preferring the
/// server's `error` or `message` field over the raw body.
pub(crate) fn map_http_error(status: u16, body: &str) -> EnBuddyError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.error.or(r.message))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP error! status: {status}")
            } else {
                body.trim().to_string()
            }
        });

    EnBuddyError::http(status, message)
}

#[derive(Serialize)]
struct TitleBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CardsRequest<'a> {
    session_id: &'a str,
    chat_history: &'a str,
}

#[derive(Serialize)]
struct StatusBody {
    status: CardStatus,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    config: BackendConfig,
}

impl BackendClient {
    /// Builds a client for `config`, applying the connect timeout from
    /// `stream`. Requests have no overall timeout.
    pub fn new(config: BackendConfig, stream: &StreamConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = stream.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| EnBuddyError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        self.config.url(path)
    }

    fn endpoint_url(&self, base: &str, suffix: impl std::fmt::Display) -> String {
        self.url(&format!("{}/{}", base.trim_end_matches('/'), suffix))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| EnBuddyError::network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "Backend request failed");
        Err(map_http_error(status.as_u16(), &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        self.send(request).await.map(|_| ())
    }

    // ---------------------------------------------------------------------
    // Conversations
    // ---------------------------------------------------------------------

    pub async fn list_conversations(&self, page: u32, size: u32) -> Result<Vec<ConversationSummary>> {
        let request = self
            .client
            .get(self.url(&self.config.endpoints.conversations))
            .query(&[("page", page), ("size", size)]);
        let page: ConversationPage = self.send_json(request).await?;
        Ok(page.into_items())
    }

    pub async fn create_conversation(&self, title: Option<&str>) -> Result<ConversationSummary> {
        let title = title.map(str::trim).filter(|t| !t.is_empty());
        let request = self
            .client
            .post(self.url(&self.config.endpoints.conversations))
            .json(&TitleBody { title });
        self.send_json(request).await
    }

    pub async fn delete_conversation(&self, id: i64) -> Result<()> {
        let url = self.endpoint_url(&self.config.endpoints.conversations, id);
        self.send_empty(self.client.delete(url)).await
    }

    pub async fn rename_conversation(&self, id: i64, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EnBuddyError::validation("conversation title is empty"));
        }
        let url = self.endpoint_url(&self.config.endpoints.conversations, format!("{id}/title"));
        self.send_empty(self.client.put(url).json(&TitleBody { title: Some(title) }))
            .await
    }

    pub async fn conversation_messages(&self, id: i64) -> Result<Vec<ConversationMessage>> {
        let url = self.endpoint_url(&self.config.endpoints.conversations, format!("{id}/messages"));
        self.send_json(self.client.get(url)).await
    }

    // ---------------------------------------------------------------------
    // Vocabulary
    // ---------------------------------------------------------------------

    /// Asks the coach to pick flashcards out of a chat history and store
    /// them.
    pub async fn analyze_and_save_cards(
        &self,
        session_id: &str,
        chat_history: &str,
    ) -> Result<CardExtraction> {
        if chat_history.trim().is_empty() {
            return Err(EnBuddyError::validation("chat history is empty"));
        }
        let request = self
            .client
            .post(self.url(&self.config.endpoints.coach_analyze_cards))
            .json(&CardsRequest {
                session_id,
                chat_history,
            });
        self.send_json(request).await
    }

    pub async fn vocabulary_list(&self) -> Result<Vec<VocabularyCard>> {
        let request = self
            .client
            .get(self.url(&self.config.endpoints.vocabulary))
            .query(&[("userId", self.config.user_id)]);
        self.send_json(request).await
    }

    pub async fn update_card_status(&self, id: i64, status: CardStatus) -> Result<VocabularyCard> {
        let url = self.endpoint_url(&self.config.endpoints.vocabulary, format!("{id}/status"));
        self.send_json(self.client.put(url).json(&StatusBody { status }))
            .await
    }

    pub async fn delete_card(&self, id: i64) -> Result<()> {
        let url = self.endpoint_url(&self.config.endpoints.vocabulary, id);
        self.send_empty(self.client.delete(url)).await
    }

    // ---------------------------------------------------------------------
    // Translation
    // ---------------------------------------------------------------------

    pub async fn translate(&self, text: &str) -> Result<Translation> {
        if text.trim().is_empty() {
            return Err(EnBuddyError::validation("text to translate is empty"));
        }
        let request = self
            .client
            .post(self.url(&self.config.endpoints.translate))
            .json(&TranslateRequest { text });
        self.send_json(request).await
    }
}
