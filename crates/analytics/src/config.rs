//! Pipeline settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::user_agent::ClassifierKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ingest_timeout_ms: u64,
    pub read_timeout_ms: u64,
    /// Offset applied to hour, minute, and day bucket labels
    pub utc_offset_minutes: i32,
    pub classifier: ClassifierKind,
    pub rollup_cache_ttl_secs: u64,
    pub rollup_cache_capacity: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ingest_timeout_ms: 5_000,
            read_timeout_ms: 10_000,
            utc_offset_minutes: 0,
            classifier: ClassifierKind::default(),
            rollup_cache_ttl_secs: 300,
            rollup_cache_capacity: 10_000,
        }
    }
}

impl PipelineConfig {
    pub fn ingest_timeout(&self) -> Duration {
        Duration::from_millis(self.ingest_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn rollup_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.rollup_cache_ttl_secs)
    }
}
