//! Mock implementations for testing.

use async_trait::async_trait;
use engine_core::{Error, EventRecord, Result};
use event_store::{EventFilter, EventStore, MemoryEventStore};
use parking_lot::Mutex;
use std::sync::Arc;

/// In-memory store with a switchable failure mode.
///
/// Implements the same `EventStore` trait as the file store, so tests run
/// every production code path except disk I/O.
#[derive(Clone)]
pub struct MockStore {
    inner: Arc<MemoryEventStore>,
    /// Simulate failures if set.
    should_fail: Arc<Mutex<bool>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryEventStore::new()),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    /// Number of stored records across projects.
    pub fn record_count(&self) -> usize {
        self.inner.len()
    }

    /// Stored records of one project in append order.
    pub async fn records(&self, project_key: &str) -> Vec<EventRecord> {
        self.inner
            .scan(&EventFilter::project(project_key))
            .await
            .unwrap_or_default()
    }

    /// Set failure mode for testing error handling.
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    fn check(&self) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::store_unavailable("mock store failure"));
        }
        Ok(())
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MockStore {
    async fn append_batch(&self, records: &[EventRecord]) -> Result<()> {
        self.check()?;
        self.inner.append_batch(records).await
    }

    async fn scan(&self, filter: &EventFilter) -> Result<Vec<EventRecord>> {
        self.check()?;
        self.inner.scan(filter).await
    }

    async fn max_id(&self) -> Result<u64> {
        self.inner.max_id().await
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }

    fn backend(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64) -> EventRecord {
        EventRecord {
            id,
            project_key: "p1".into(),
            event_type: "pageview".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_mock_store_captures_records() {
        let mock = MockStore::new();
        mock.append_batch(&[record(1), record(2)]).await.unwrap();

        assert_eq!(mock.record_count(), 2);
        assert_eq!(mock.records("p1").await[1].id, 2);
        assert_eq!(mock.max_id().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_mock_store_failure_mode() {
        let mock = MockStore::new();
        mock.set_should_fail(true);

        assert!(mock.append_batch(&[record(1)]).await.is_err());
        assert!(mock.ping().await.is_err());
        assert_eq!(mock.record_count(), 0);

        mock.set_should_fail(false);
        assert!(mock.ping().await.is_ok());
    }
}
