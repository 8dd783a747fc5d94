//! Platform paths for En-Buddy files.
//!
//! All paths are resolved via AppPaths from the version-migrate crate so
//! they follow the platform conventions (XDG on Linux).
//!
//! ```text
//! ~/.config/en-buddy/
//! ├── config.toml                 # Client configuration
//! ├── en-buddy-playground.json    # Analysis history store
//! └── logs/                       # Rolling log files
//! ```

use en_buddy_core::error::{EnBuddyError, Result};
use std::path::PathBuf;
use version_migrate::AppPaths;

/// Name of the analysis history store document.
pub const STORE_FILE_NAME: &str = "en-buddy-playground.json";

pub struct EnBuddyPaths;

impl EnBuddyPaths {
    fn app_paths() -> AppPaths {
        AppPaths::new("en-buddy")
    }

    pub fn config_dir() -> Result<PathBuf> {
        Self::app_paths()
            .config_dir()
            .map_err(|_| EnBuddyError::config("cannot find home directory"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Default location of the analysis history store.
    pub fn store_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(STORE_FILE_NAME))
    }

    pub fn log_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("logs"))
    }
}
