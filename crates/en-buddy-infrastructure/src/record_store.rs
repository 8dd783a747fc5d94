//! Versioned, capped store of analysis records.
//!
//! The whole store is one JSON document in a [`StorageSlot`]. It is read
//! lazily on first access and written back after every mutation. A stored
//! document with a different schema version, or one that cannot be parsed,
//! is discarded in favour of the empty initial state.

use crate::storage::StorageSlot;
use chrono::{DateTime, Utc};
use en_buddy_core::error::{EnBuddyError, Result};
use en_buddy_core::record::{
    AnalysisRecord, NewRecord, RecordIdGenerator, RecordPatch, RecordStoreState, STORE_VERSION,
};
use serde_json::Value as JsonValue;
use std::cell::OnceCell;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Persistent history of coach analyses.
///
/// Invariants maintained by every operation:
/// - records are ordered most recent first
/// - at most `max_records` records are kept; the oldest are dropped
/// - record ids are unique
pub struct VersionedRecordStore<S: StorageSlot> {
    slot: S,
    max_records: usize,
    state: OnceCell<RecordStoreState>,
    ids: RecordIdGenerator,
    clock: Clock,
}

impl<S: StorageSlot> VersionedRecordStore<S> {
    pub fn new(slot: S, max_records: usize) -> Self {
        Self {
            slot,
            max_records: max_records.max(1),
            state: OnceCell::new(),
            ids: RecordIdGenerator::new(),
            clock: Box::new(Utc::now),
        }
    }

    /// Replaces the wall clock used for ids and timestamps.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Reads the slot and validates the stored document.
    ///
    /// Never fails: anything unusable yields the initial state.
    pub fn load(&self) -> RecordStoreState {
        let value = match self.slot.read() {
            Ok(Some(value)) => value,
            Ok(None) => return RecordStoreState::new(),
            Err(e) => {
                tracing::warn!(
                    location = %self.slot.location(),
                    error = %e,
                    "Failed to read record store, starting empty"
                );
                return RecordStoreState::new();
            }
        };

        let version = value.get("version").and_then(JsonValue::as_u64);
        if version != Some(u64::from(STORE_VERSION)) {
            tracing::warn!(
                location = %self.slot.location(),
                found = ?version,
                expected = STORE_VERSION,
                "Record store version mismatch, resetting"
            );
            return RecordStoreState::new();
        }

        match serde_json::from_value::<RecordStoreState>(value) {
            Ok(mut state) => {
                state.records.truncate(self.max_records);
                state
            }
            Err(e) => {
                tracing::warn!(
                    location = %self.slot.location(),
                    error = %e,
                    "Record store document is malformed, resetting"
                );
                RecordStoreState::new()
            }
        }
    }

    /// Current state, loading it on first access.
    pub fn state(&self) -> &RecordStoreState {
        self.state.get_or_init(|| self.load())
    }

    /// All records, most recent first.
    pub fn records(&self) -> &[AnalysisRecord] {
        &self.state().records
    }

    pub fn current_record(&self) -> Option<&AnalysisRecord> {
        self.state().current_record()
    }

    pub fn get(&self, id: &str) -> Option<&AnalysisRecord> {
        self.state().get(id)
    }

    /// Creates a record at the front, makes it current and returns its id.
    pub fn save(&mut self, new_record: NewRecord) -> Result<String> {
        let now = (self.clock)();
        let max_records = self.max_records;

        self.ensure_loaded();
        let state = loaded_mut(&mut self.state)?;
        self.ids.observe(state.records.iter().map(|r| r.id.as_str()));
        let id = self.ids.next_id(now);

        state
            .records
            .insert(0, AnalysisRecord::create(id.clone(), new_record, now));
        state.records.truncate(max_records);
        state.current_record_id = Some(id.clone());

        tracing::debug!(record_id = %id, "Saved analysis record");
        self.persist()?;
        Ok(id)
    }

    /// Points the current record at `id`. The id is not checked against the
    /// stored records; a dangling pointer reads as "no current record".
    pub fn select(&mut self, id: &str) -> Result<()> {
        self.ensure_loaded();
        loaded_mut(&mut self.state)?.current_record_id = Some(id.to_string());
        self.persist()
    }

    /// Removes the record with `id`. Clears the current pointer when it
    /// pointed at the removed record. Returns whether a record was removed.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        self.ensure_loaded();
        let state = loaded_mut(&mut self.state)?;
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        let removed = state.records.len() != before;

        if state.current_record_id.as_deref() == Some(id) {
            state.current_record_id = None;
        }

        self.persist()?;
        Ok(removed)
    }

    /// Sets the takeaway of a record. Returns `false` without writing when
    /// the id is unknown.
    pub fn update_takeaway(&mut self, id: &str, takeaway: impl Into<String>) -> Result<bool> {
        self.update_fields(
            id,
            RecordPatch {
                takeaway: Some(Some(takeaway.into())),
                ..Default::default()
            },
        )
    }

    /// Applies a partial update to a record and refreshes its `updated_at`.
    /// Returns `false` without writing when the id is unknown.
    pub fn update_fields(&mut self, id: &str, patch: RecordPatch) -> Result<bool> {
        let now = (self.clock)();
        self.ensure_loaded();
        let state = loaded_mut(&mut self.state)?;

        let Some(record) = state.records.iter_mut().find(|r| r.id == id) else {
            tracing::debug!(record_id = %id, "Update for unknown record ignored");
            return Ok(false);
        };
        record.apply(patch, now);

        self.persist()?;
        Ok(true)
    }

    /// Clears the current pointer and keeps every record.
    pub fn clear_current(&mut self) -> Result<()> {
        self.ensure_loaded();
        loaded_mut(&mut self.state)?.current_record_id = None;
        self.persist()
    }

    /// Drops every record.
    pub fn clear_all(&mut self) -> Result<()> {
        self.ensure_loaded();
        *loaded_mut(&mut self.state)? = RecordStoreState::new();
        self.persist()
    }

    fn ensure_loaded(&self) {
        let _ = self.state();
    }

    /// Writes the in-memory state back to the slot. On failure the
    /// in-memory state is kept as is.
    fn persist(&self) -> Result<()> {
        let state = self.state();
        let value = serde_json::to_value(state)?;

        self.slot.write(&value).map_err(|e| {
            tracing::error!(
                location = %self.slot.location(),
                error = %e,
                "Failed to persist record store"
            );
            match e {
                EnBuddyError::Storage(_) => e,
                other => EnBuddyError::storage(other.to_string()),
            }
        })
    }
}

fn loaded_mut(cell: &mut OnceCell<RecordStoreState>) -> Result<&mut RecordStoreState> {
    cell.get_mut()
        .ok_or_else(|| EnBuddyError::internal("record store state not loaded"))
}
