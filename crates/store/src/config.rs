//! Event store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use engine_core::Result;

use crate::file::FileEventStore;
use crate::memory::MemoryEventStore;
use crate::store::EventStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
}

/// Event store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// JSON-lines log location for the file backend
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

fn default_backend() -> StoreBackend {
    StoreBackend::File
}

fn default_path() -> PathBuf {
    PathBuf::from("data/events.jsonl")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_path(),
        }
    }
}

/// Opens the configured backend.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn EventStore>> {
    Ok(match config.backend {
        StoreBackend::Memory => Arc::new(MemoryEventStore::new()),
        StoreBackend::File => Arc::new(FileEventStore::open(&config.path).await?),
    })
}
