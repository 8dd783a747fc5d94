//! Playground use case: analyse a chat history and keep the report.
//!
//! `PlaygroundUseCase` coordinates the streaming [`AnalysisAssembler`] with
//! the persistent [`VersionedRecordStore`] so that every successful analysis
//! becomes the current history record, and selecting a record brings its
//! report back into view.

use en_buddy_core::error::{EnBuddyError, Result};
use en_buddy_core::record::{AnalysisRecord, NewRecord};
use en_buddy_infrastructure::{StorageSlot, VersionedRecordStore};
use en_buddy_interaction::AnalysisAssembler;
use tokio_util::sync::CancellationToken;

/// A completed and stored analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeResult {
    pub record_id: String,
    pub analysis: String,
}

pub struct PlaygroundUseCase<S: StorageSlot> {
    coach: AnalysisAssembler,
    store: VersionedRecordStore<S>,
}

impl<S: StorageSlot> PlaygroundUseCase<S> {
    pub fn new(coach: AnalysisAssembler, store: VersionedRecordStore<S>) -> Self {
        Self { coach, store }
    }

    pub fn coach(&self) -> &AnalysisAssembler {
        &self.coach
    }

    pub fn store(&self) -> &VersionedRecordStore<S> {
        &self.store
    }

    /// Runs an analysis and stores it as the current record.
    ///
    /// Returns `Ok(None)` when the analysis did not complete; the reason is
    /// available from [`AnalysisAssembler::error`] via [`coach`](Self::coach).
    pub async fn analyze(
        &mut self,
        chat_history: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<AnalyzeResult>> {
        let Some(analysis) = self.coach.analyze_chat(chat_history, cancel).await? else {
            return Ok(None);
        };

        let record_id = self.store.save(NewRecord {
            chat_history: chat_history.to_string(),
            analysis: analysis.clone(),
        })?;
        tracing::info!(record_id = %record_id, "Analysis stored");

        Ok(Some(AnalyzeResult {
            record_id,
            analysis,
        }))
    }

    /// Makes `id` the current record and shows its report.
    pub fn select_record(&mut self, id: &str) -> Result<AnalysisRecord> {
        let record = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| EnBuddyError::not_found("AnalysisRecord", id))?;

        self.store.select(id)?;
        self.coach.set_analysis_content(record.analysis.clone());
        Ok(record)
    }

    /// Leaves the current record and clears the visible report.
    pub fn new_analysis(&mut self) -> Result<()> {
        self.coach.clear_analysis();
        self.store.clear_current()
    }

    /// Stores a takeaway on the current record.
    pub fn save_takeaway(&mut self, takeaway: &str) -> Result<()> {
        let id = self
            .store
            .current_record()
            .map(|r| r.id.clone())
            .ok_or_else(|| EnBuddyError::not_found("AnalysisRecord", "current"))?;

        self.store.update_takeaway(&id, takeaway.trim())?;
        Ok(())
    }

    pub fn delete_record(&mut self, id: &str) -> Result<bool> {
        self.store.delete(id)
    }

    pub fn records(&self) -> &[AnalysisRecord] {
        self.store.records()
    }

    pub fn current_record(&self) -> Option<&AnalysisRecord> {
        self.store.current_record()
    }
}
