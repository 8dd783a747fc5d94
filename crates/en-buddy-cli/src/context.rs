//! Wiring shared by the subcommands.

use anyhow::{Context, Result};
use en_buddy_core::config::EnBuddyConfig;
use en_buddy_infrastructure::{ConfigService, JsonFileSlot, VersionedRecordStore};
use en_buddy_interaction::{BackendClient, HttpTransport, StreamClient};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line overrides applied on top of the config file and the
/// environment.
#[derive(Debug, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub base_url: Option<String>,
    pub store: Option<PathBuf>,
}

pub struct AppContext {
    pub config: EnBuddyConfig,
}

impl AppContext {
    pub fn load(overrides: Overrides) -> Result<Self> {
        let service = match overrides.config {
            Some(path) => ConfigService::with_path(path),
            None => ConfigService::new(),
        };
        let mut config = service.get_config().context("Failed to load configuration")?;

        if let Some(base_url) = overrides.base_url {
            config.backend.base_url = base_url;
        }
        if let Some(store) = overrides.store {
            config.store.path = Some(store);
        }

        tracing::debug!(base_url = %config.backend.base_url, "Configuration loaded");
        Ok(Self { config })
    }

    pub fn stream_client(&self) -> Result<StreamClient> {
        let transport = HttpTransport::new(self.config.backend.clone(), &self.config.stream)
            .context("Failed to create HTTP transport")?;
        Ok(StreamClient::new(
            Arc::new(transport),
            self.config.stream.read_timeout(),
        ))
    }

    pub fn backend(&self) -> Result<BackendClient> {
        BackendClient::new(self.config.backend.clone(), &self.config.stream)
            .context("Failed to create backend client")
    }

    pub fn record_store(&self) -> Result<VersionedRecordStore<JsonFileSlot>> {
        let path = ConfigService::store_path(&self.config).context("Failed to resolve store path")?;
        tracing::debug!(path = %path.display(), "Opening record store");
        Ok(VersionedRecordStore::new(
            JsonFileSlot::new(path),
            self.config.store.max_records,
        ))
    }
}
