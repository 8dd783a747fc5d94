//! JSON document stored in a single file.
//!
//! Writes go through a temporary sibling file that is fsynced and then
//! renamed over the target, under an exclusive lock on a `.lock` sibling.
//! A reader therefore sees either the previous document or the new one.

use super::slot::StorageSlot;
use en_buddy_core::error::{EnBuddyError, Result};
use serde_json::Value as JsonValue;
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

/// File-backed [`StorageSlot`].
#[derive(Debug, Clone)]
pub struct JsonFileSlot {
    path: PathBuf,
}

impl JsonFileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| EnBuddyError::storage("store path has no parent directory"))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| EnBuddyError::storage("store path has no file name"))?;

        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }

    fn write_atomically(&self, contents: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let _lock = FileLock::acquire(&self.path)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(contents)?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl StorageSlot for JsonFileSlot {
    fn read(&self) -> Result<Option<JsonValue>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&content)?))
    }

    fn write(&self, value: &JsonValue) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.write_atomically(json.as_bytes()).map_err(|e| {
            EnBuddyError::storage(format!(
                "failed to write {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Exclusive lock on `<path>.lock`, released when dropped.
///
/// The lock file is never removed, so every writer locks the same inode.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| EnBuddyError::storage(format!("failed to acquire lock: {e}")))?;
        }

        Ok(FileLock { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use fs2::FileExt;
            let _ = self.file.unlock();
        }
        #[cfg(not(unix))]
        let _ = &self.file;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let slot = JsonFileSlot::new(temp_dir.path().join("en-buddy-playground.json"));

        slot.write(&json!({"version": 1, "records": []})).unwrap();

        let loaded = slot.read().unwrap().unwrap();
        assert_eq!(loaded["version"], 1);
        assert!(loaded["records"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let slot = JsonFileSlot::new(temp_dir.path().join("missing.json"));
        assert!(slot.read().unwrap().is_none());
    }

    #[test]
    fn test_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("store.json");
        let slot = JsonFileSlot::new(&path);

        slot.write(&json!({"version": 1})).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_no_temp_file_left_and_lock_file_kept() {
        let temp_dir = TempDir::new().unwrap();
        let slot = JsonFileSlot::new(temp_dir.path().join("store.json"));
        slot.write(&json!({"version": 1})).unwrap();
        slot.write(&json!({"version": 1, "records": []})).unwrap();

        let mut names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["store.json".to_string(), "store.lock".to_string()]);
    }

    #[test]
    fn test_concurrent_writers_never_tear_the_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        let handles: Vec<_> = (0..4)
            .map(|writer| {
                let slot = JsonFileSlot::new(&path);
                std::thread::spawn(move || {
                    for round in 0..10 {
                        let records: Vec<u32> = (0..50).map(|i| writer * 1000 + round + i).collect();
                        slot.write(&json!({"version": 1, "records": records})).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded = JsonFileSlot::new(&path).read().unwrap().unwrap();
        assert_eq!(loaded["records"].as_array().unwrap().len(), 50);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        fs::write(&path, "{\"version\": 1,").unwrap();

        let err = JsonFileSlot::new(&path).read().unwrap_err();
        assert!(matches!(err, EnBuddyError::Serialization { .. }));
    }

    #[test]
    fn test_write_failure_is_a_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = temp_dir.path().join("store.json");
        fs::create_dir_all(path.join("occupied")).unwrap();

        let err = JsonFileSlot::new(&path).write(&json!({})).unwrap_err();
        assert!(err.is_storage());
    }
}
