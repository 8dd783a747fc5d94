//! Vocabulary flashcard models.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EnBuddyError;

/// Review status of a flashcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    New,
    Remembered,
    Mastered,
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CardStatus::New => "new",
            CardStatus::Remembered => "remembered",
            CardStatus::Mastered => "mastered",
        };
        f.write_str(s)
    }
}

impl FromStr for CardStatus {
    type Err = EnBuddyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(CardStatus::New),
            "remembered" => Ok(CardStatus::Remembered),
            "mastered" => Ok(CardStatus::Mastered),
            other => Err(EnBuddyError::validation(format!(
                "unknown card status '{other}' (expected new, remembered or mastered)"
            ))),
        }
    }
}

/// Creation time as sent by the backend: either epoch millis or a
/// formatted string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardTimestamp {
    Millis(i64),
    Text(String),
}

/// A saved vocabulary flashcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyCard {
    pub id: i64,
    pub word: String,
    pub meaning: String,
    #[serde(default)]
    pub context_scene: Option<String>,
    #[serde(default)]
    pub original_sentence: Option<String>,
    #[serde(default)]
    pub tip: Option<String>,
    pub status: CardStatus,
    #[serde(default)]
    pub created_at: Option<CardTimestamp>,
}

impl VocabularyCard {
    /// Returns the original sentence with every occurrence of the word
    /// blanked out, ignoring case. Empty when there is nothing to blank.
    pub fn cloze(&self) -> String {
        let Some(sentence) = self.original_sentence.as_deref() else {
            return String::new();
        };
        if self.word.trim().is_empty() {
            return String::new();
        }

        match RegexBuilder::new(&regex::escape(&self.word))
            .case_insensitive(true)
            .build()
        {
            Ok(pattern) => pattern.replace_all(sentence, "______").into_owned(),
            Err(_) => sentence.to_string(),
        }
    }
}

/// A card proposed by the extraction endpoint, before it has been saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDraft {
    pub word: String,
    pub meaning: String,
    #[serde(default)]
    pub context_scene: Option<String>,
    #[serde(default)]
    pub original_sentence: Option<String>,
    #[serde(default)]
    pub tip: Option<String>,
}

/// Result of extracting cards from a chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardExtraction {
    #[serde(default)]
    pub cards: Vec<CardDraft>,
    #[serde(default)]
    pub saved_count: u32,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Cards still due for review: everything not yet mastered.
pub fn review_queue(cards: &[VocabularyCard]) -> Vec<&VocabularyCard> {
    cards
        .iter()
        .filter(|c| c.status != CardStatus::Mastered)
        .collect()
}
