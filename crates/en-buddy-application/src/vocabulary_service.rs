//! Flashcard review workflow over the backend vocabulary endpoints.

use en_buddy_core::error::Result;
use en_buddy_core::vocabulary::{CardExtraction, CardStatus, VocabularyCard, review_queue};
use en_buddy_interaction::BackendClient;

#[derive(Debug, Clone)]
pub struct VocabularyService {
    backend: BackendClient,
}

impl VocabularyService {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    /// Extracts and saves flashcards from a chat history.
    pub async fn extract(&self, session_id: &str, chat_history: &str) -> Result<CardExtraction> {
        let extraction = self
            .backend
            .analyze_and_save_cards(session_id, chat_history)
            .await?;
        tracing::info!(saved = extraction.saved_count, "Vocabulary cards extracted");
        Ok(extraction)
    }

    pub async fn list(&self) -> Result<Vec<VocabularyCard>> {
        self.backend.vocabulary_list().await
    }

    /// Cards still to review, in backend order.
    pub async fn review_queue(&self) -> Result<Vec<VocabularyCard>> {
        let cards = self.backend.vocabulary_list().await?;
        Ok(review_queue(&cards).into_iter().cloned().collect())
    }

    pub async fn mark(&self, id: i64, status: CardStatus) -> Result<VocabularyCard> {
        self.backend.update_card_status(id, status).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.backend.delete_card(id).await
    }
}
