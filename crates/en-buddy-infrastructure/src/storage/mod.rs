//! Storage slots for whole-document persistence.

mod json_file;
mod slot;

pub use json_file::JsonFileSlot;
pub use slot::{MemorySlot, StorageSlot};
