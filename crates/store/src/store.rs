//! The event store interface.

use async_trait::async_trait;
use engine_core::schema::TimeRange;
use engine_core::{EventRecord, Result};

/// Scan criteria. Time bounds are inclusive and compared as strings, which
/// is exact for canonical timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub project_key: String,
    pub event_type: Option<String>,
    pub range: TimeRange,
}

impl EventFilter {
    pub fn project(project_key: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }

    pub fn matches(&self, record: &EventRecord) -> bool {
        record.project_key == self.project_key
            && self
                .event_type
                .as_deref()
                .map_or(true, |t| record.event_type == t)
            && self.range.contains(&record.timestamp)
    }
}

/// Append-only persistence of event records.
///
/// Ids are assigned by the caller before append. Scans return matching
/// records in no particular order.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persists records. Fails the whole call if storage is unavailable.
    async fn append_batch(&self, records: &[EventRecord]) -> Result<()>;

    /// Persists a single record.
    async fn append(&self, record: &EventRecord) -> Result<()> {
        self.append_batch(std::slice::from_ref(record)).await
    }

    /// Returns every record matching `filter`. Unreadable stored records are
    /// skipped.
    async fn scan(&self, filter: &EventFilter) -> Result<Vec<EventRecord>>;

    /// Highest id ever stored, 0 when empty.
    async fn max_id(&self) -> Result<u64>;

    /// Cheap availability probe.
    async fn ping(&self) -> Result<()>;

    /// Backend name for logs and health reports.
    fn backend(&self) -> &'static str;
}
