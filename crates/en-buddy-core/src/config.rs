//! Client configuration.
//!
//! Everything that used to be a module-level constant (backend address,
//! endpoint paths, storage slot, record cap) is carried in these types and
//! passed into constructors, so independent instances can coexist.

use crate::record::MAX_RECORDS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration, read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnBuddyConfig {
    pub backend: BackendConfig,
    pub stream: StreamConfig,
    pub store: StoreConfig,
}

/// Where the backend lives and how its endpoints are named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL without a trailing slash, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// User id sent with vocabulary queries.
    pub user_id: u64,
    pub endpoints: Endpoints,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            user_id: 1,
            endpoints: Endpoints::default(),
        }
    }
}

impl BackendConfig {
    /// Joins `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

/// Endpoint paths, relative to [`BackendConfig::base_url`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub chat_stream: String,
    /// Prefix; the session id is appended as the last path segment.
    pub chat_memory: String,
    pub coach_analyze: String,
    pub coach_analyze_cards: String,
    pub vocabulary: String,
    pub conversations: String,
    pub translate: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            chat_stream: "/api/chat/stream".to_string(),
            chat_memory: "/api/chat/memory".to_string(),
            coach_analyze: "/api/coach/analyze".to_string(),
            coach_analyze_cards: "/api/coach/analyze-cards".to_string(),
            vocabulary: "/api/vocabulary".to_string(),
            conversations: "/api/conversations".to_string(),
            translate: "/translation/translate".to_string(),
        }
    }
}

/// Timeouts for streaming requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Longest wait for the next body chunk, in seconds. `0` disables it.
    pub read_timeout_secs: u64,
    /// Connection establishment timeout, in seconds. `0` disables it.
    pub connect_timeout_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            read_timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

impl StreamConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.read_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.connect_timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Location and capacity of the analysis history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the store document. `None` resolves to the platform config
    /// directory.
    pub path: Option<PathBuf>,
    pub max_records: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_records: MAX_RECORDS,
        }
    }
}
