//! Single-document storage slots.
//!
//! A slot holds exactly one JSON document under a fixed name. The record
//! store reads the whole document on first access and writes the whole
//! document back after every mutation.

use en_buddy_core::error::{EnBuddyError, Result};
use serde_json::Value as JsonValue;
use std::sync::Mutex;

/// A named location holding one JSON document.
pub trait StorageSlot: Send + Sync {
    /// Reads the stored document.
    ///
    /// - `Ok(Some(value))`: a document is present and parses as JSON
    /// - `Ok(None)`: nothing has been stored yet
    /// - `Err`: the slot could not be read or does not hold valid JSON
    fn read(&self) -> Result<Option<JsonValue>>;

    /// Replaces the stored document.
    fn write(&self, value: &JsonValue) -> Result<()>;

    /// Human-readable location used in log messages.
    fn location(&self) -> String;
}

/// Process-local slot kept in memory.
///
/// Stores the serialized text rather than the value so that corrupt
/// contents can be planted and read back the same way a file would be.
#[derive(Debug, Default)]
pub struct MemorySlot {
    contents: Mutex<Option<String>>,
    fail_writes: bool,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot that already holds `contents`.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
            fail_writes: false,
        }
    }

    /// Creates a slot whose writes always fail, e.g. a full disk.
    pub fn failing() -> Self {
        Self {
            contents: Mutex::new(None),
            fail_writes: true,
        }
    }

    /// Returns the raw stored text.
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|guard| guard.clone())
    }
}

impl StorageSlot for MemorySlot {
    fn read(&self) -> Result<Option<JsonValue>> {
        let guard = self
            .contents
            .lock()
            .map_err(|e| EnBuddyError::internal(format!("memory slot poisoned: {e}")))?;

        match guard.as_deref() {
            None => Ok(None),
            Some(text) if text.trim().is_empty() => Ok(None),
            Some(text) => Ok(Some(serde_json::from_str(text)?)),
        }
    }

    fn write(&self, value: &JsonValue) -> Result<()> {
        if self.fail_writes {
            return Err(EnBuddyError::storage("memory slot rejects writes"));
        }
        let text = serde_json::to_string(value)?;
        let mut guard = self
            .contents
            .lock()
            .map_err(|e| EnBuddyError::internal(format!("memory slot poisoned: {e}")))?;
        *guard = Some(text);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
