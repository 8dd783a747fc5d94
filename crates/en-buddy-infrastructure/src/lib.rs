pub mod config_service;
pub mod paths;
pub mod record_store;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::paths::EnBuddyPaths;
pub use crate::record_store::VersionedRecordStore;
pub use crate::storage::{JsonFileSlot, MemorySlot, StorageSlot};
