//! Configuration service.
//!
//! Loads [`EnBuddyConfig`] from `config.toml` in the platform config
//! directory, then applies environment overrides. The result is cached
//! until [`ConfigService::invalidate_cache`] is called.

use crate::paths::EnBuddyPaths;
use en_buddy_core::config::EnBuddyConfig;
use en_buddy_core::error::{EnBuddyError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Overrides `backend.base_url`.
pub const ENV_BASE_URL: &str = "EN_BUDDY_BASE_URL";
/// Overrides `store.path`.
pub const ENV_STORE_PATH: &str = "EN_BUDDY_STORE_PATH";

#[derive(Debug, Clone)]
pub struct ConfigService {
    /// Explicit config file; `None` uses the platform default.
    path: Option<PathBuf>,
    config: Arc<RwLock<Option<EnBuddyConfig>>>,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Uses `path` instead of the platform config file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => EnBuddyPaths::config_file(),
        }
    }

    /// Gets the configuration, loading it on first access.
    pub fn get_config(&self) -> Result<EnBuddyConfig> {
        if let Ok(guard) = self.config.read() {
            if let Some(cached) = guard.as_ref() {
                return Ok(cached.clone());
            }
        }

        let mut loaded = Self::load_file(&self.config_path()?)?;
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());

        if let Ok(mut guard) = self.config.write() {
            *guard = Some(loaded.clone());
        }
        Ok(loaded)
    }

    pub fn invalidate_cache(&self) {
        if let Ok(mut guard) = self.config.write() {
            *guard = None;
        }
    }

    /// Reads a config file. A missing or empty file yields the defaults.
    pub fn load_file(path: &Path) -> Result<EnBuddyConfig> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(EnBuddyConfig::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(EnBuddyConfig::default());
        }

        toml::from_str(&content).map_err(|e| {
            EnBuddyError::config(format!("invalid config file {}: {}", path.display(), e))
        })
    }

    /// Resolves the store document path: the configured one, or the
    /// platform default.
    pub fn store_path(config: &EnBuddyConfig) -> Result<PathBuf> {
        match &config.store.path {
            Some(path) => Ok(path.clone()),
            None => EnBuddyPaths::store_file(),
        }
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies environment overrides. `lookup` is `std::env::var` in production.
pub fn apply_env_overrides(config: &mut EnBuddyConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
        config.backend.base_url = base_url.trim().to_string();
    }
    if let Some(store_path) = lookup(ENV_STORE_PATH).filter(|v| !v.trim().is_empty()) {
        config.store.path = Some(PathBuf::from(store_path.trim()));
    }
}
