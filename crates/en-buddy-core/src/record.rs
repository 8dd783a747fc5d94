//! Analysis history domain models.
//!
//! An [`AnalysisRecord`] is one completed coach analysis together with the
//! chat history it was produced from. [`RecordStoreState`] is the full
//! persisted document: a schema version, the records (most recent first)
//! and a pointer to the currently selected record.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Schema version embedded in every persisted store document.
///
/// A stored document carrying any other version is discarded on load.
pub const STORE_VERSION: u32 = 1;

/// Default maximum number of records kept in the store.
pub const MAX_RECORDS: usize = 50;

/// Maximum length of a derived title, in characters.
pub const TITLE_MAX_CHARS: usize = 50;

/// Title used when the chat history has no usable first line.
pub const UNTITLED_RECORD: &str = "未命名分析";

/// A persisted coach analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    /// Unique id derived from the creation time. Never changes.
    pub id: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last modification timestamp (RFC 3339)
    pub updated_at: String,
    /// First line of the chat history, truncated
    pub title: String,
    /// The chat history text that was analysed
    pub chat_history: String,
    /// The accumulated analysis report
    pub analysis: String,
    /// Optional one-line takeaway written by the user
    #[serde(default)]
    pub takeaway: Option<String>,
}

/// Input for creating a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub chat_history: String,
    pub analysis: String,
}

/// Partial update applied to an existing record.
///
/// `None` leaves a field untouched. The id and creation time cannot be
/// patched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub title: Option<String>,
    pub chat_history: Option<String>,
    pub analysis: Option<String>,
    /// `Some(None)` clears the takeaway.
    pub takeaway: Option<Option<String>>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.chat_history.is_none()
            && self.analysis.is_none()
            && self.takeaway.is_none()
    }
}

impl AnalysisRecord {
    /// Builds a record stamped at `now` with a title derived from the
    /// chat history.
    pub fn create(id: String, new_record: NewRecord, now: DateTime<Utc>) -> Self {
        let stamp = timestamp(now);
        Self {
            id,
            created_at: stamp.clone(),
            updated_at: stamp,
            title: derive_title(&new_record.chat_history),
            chat_history: new_record.chat_history,
            analysis: new_record.analysis,
            takeaway: None,
        }
    }

    /// Applies a patch and refreshes `updated_at`.
    pub fn apply(&mut self, patch: RecordPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(chat_history) = patch.chat_history {
            self.chat_history = chat_history;
        }
        if let Some(analysis) = patch.analysis {
            self.analysis = analysis;
        }
        if let Some(takeaway) = patch.takeaway {
            self.takeaway = takeaway;
        }
        self.updated_at = timestamp(now);
    }
}

/// Derives a record title from the first line of a chat history.
///
/// The line is cut to [`TITLE_MAX_CHARS`] characters. A blank first line
/// yields [`UNTITLED_RECORD`].
pub fn derive_title(chat_history: &str) -> String {
    let first_line = chat_history
        .split('\n')
        .next()
        .unwrap_or_default()
        .trim_end_matches('\r');

    if first_line.trim().is_empty() {
        return UNTITLED_RECORD.to_string();
    }

    first_line.chars().take(TITLE_MAX_CHARS).collect()
}

/// Formats a timestamp the way records persist it.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The complete persisted store document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordStoreState {
    /// Schema version of this document
    pub version: u32,
    /// Records, most recent first
    pub records: Vec<AnalysisRecord>,
    /// Currently selected record, if any
    pub current_record_id: Option<String>,
}

impl Default for RecordStoreState {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            records: Vec::new(),
            current_record_id: None,
        }
    }
}

impl RecordStoreState {
    /// Creates the empty initial state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the current pointer. A pointer to a record that no longer
    /// exists reads as "no current record".
    pub fn current_record(&self) -> Option<&AnalysisRecord> {
        let id = self.current_record_id.as_deref()?;
        self.records.iter().find(|r| r.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&AnalysisRecord> {
        self.records.iter().find(|r| r.id == id)
    }
}

/// Generates record ids from creation time while guaranteeing uniqueness.
///
/// Ids are millisecond Unix timestamps. When two records are created in the
/// same millisecond (or the clock steps back) the id is bumped past the
/// last one handed out.
#[derive(Debug, Default)]
pub struct RecordIdGenerator {
    last: i64,
}

impl RecordIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the generator with ids that already exist so new ids sort
    /// after them.
    pub fn observe<'a>(&mut self, existing: impl IntoIterator<Item = &'a str>) {
        for id in existing {
            if let Ok(value) = id.parse::<i64>() {
                self.last = self.last.max(value);
            }
        }
    }

    pub fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let candidate = now.timestamp_millis();
        self.last = if candidate > self.last {
            candidate
        } else {
            self.last + 1
        };
        self.last.to_string()
    }
}
