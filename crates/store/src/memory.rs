//! In-memory event store.

use async_trait::async_trait;
use engine_core::{EventRecord, Result};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::store::{EventFilter, EventStore};

/// Keeps records per project in append order. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    by_project: HashMap<String, Vec<EventRecord>>,
    max_id: u64,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored records across projects.
    pub fn len(&self) -> usize {
        self.inner.read().by_project.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append_batch(&self, records: &[EventRecord]) -> Result<()> {
        let mut inner = self.inner.write();
        for record in records {
            inner.max_id = inner.max_id.max(record.id);
            inner
                .by_project
                .entry(record.project_key.clone())
                .or_default()
                .push(record.clone());
        }
        Ok(())
    }

    async fn scan(&self, filter: &EventFilter) -> Result<Vec<EventRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .by_project
            .get(&filter.project_key)
            .map(|records| records.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn max_id(&self) -> Result<u64> {
        Ok(self.inner.read().max_id)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
