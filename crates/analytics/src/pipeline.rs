//! Ingest and query orchestration over an [`EventStore`].
//!
//! The only mutual exclusion is around "reserve ids, append": holding the
//! ingest lock across both keeps stored order equal to id order. Reads never
//! take it. The ingest deadline bounds how long a caller waits, not the
//! append itself, so a batch is never cut off partway through a write.

use chrono::{DateTime, FixedOffset, Utc};
use engine_core::schema::TimeRange;
use engine_core::{
    normalize_event, parse_events, timestamp, Error, EventRecord, IngestRequest, Pagination, Result,
};
use event_store::{EventFilter, EventStore, IdSequence};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use telemetry::{health, metrics};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::PipelineConfig;
use crate::listing::{paginate, type_counts, EventPage, TypeCount};
use crate::realtime::{realtime_stats, RealtimeStats};
use crate::report::{project_stats, ProjectStats};
use crate::rollup::{
    daily_rollup, dashboard, day_span, group_by_day, recent_sessions, Dashboard, RollupCache,
    REALTIME_SESSION_MINUTES,
};
use crate::user_agent::UserAgentClassifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub saved_count: u64,
    pub total_requested: u64,
}

/// Listing criteria.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub project_key: String,
    pub event_type: Option<String>,
    pub range: TimeRange,
    pub pagination: Pagination,
}

pub struct Pipeline {
    store: Arc<dyn EventStore>,
    ids: IdSequence,
    ingest_lock: Arc<Mutex<()>>,
    classifier: Box<dyn UserAgentClassifier>,
    rollups: RollupCache,
    offset: FixedOffset,
    config: PipelineConfig,
}

impl Pipeline {
    /// Builds a pipeline whose id sequence continues after the highest
    /// stored id.
    pub async fn new(store: Arc<dyn EventStore>, config: PipelineConfig) -> Result<Self> {
        let last_id = store.max_id().await?;

        info!(
            backend = store.backend(),
            last_id,
            ingest_timeout_ms = config.ingest_timeout_ms,
            read_timeout_ms = config.read_timeout_ms,
            "Pipeline ready"
        );

        Ok(Self {
            ids: IdSequence::starting_after(last_id),
            ingest_lock: Arc::new(Mutex::new(())),
            classifier: config.classifier.build(),
            rollups: RollupCache::new(config.rollup_cache_ttl(), config.rollup_cache_capacity),
            offset: timestamp::offset_from_minutes(config.utc_offset_minutes),
            store,
            config,
        })
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validates, normalizes, and appends a batch.
    ///
    /// Request-level problems fail before the store is touched. Elements
    /// that are not event objects are logged and skipped; `saved_count`
    /// reports what was actually persisted.
    #[instrument(skip_all, fields(project_key = %request.project_key, events = request.events.len()))]
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome> {
        let start = Instant::now();
        let m = metrics();
        m.batches_received.inc();

        if let Err(e) = request.check() {
            m.batches_rejected.inc();
            return Err(e);
        }

        let total_requested = request.events.len() as u64;
        m.events_received.inc_by(total_requested);

        let IngestRequest { project_key, events } = request;
        let (raw, skipped) = parse_events(events);
        for (index, e) in &skipped {
            warn!(index, error = %e, "Skipping malformed event");
        }
        m.events_skipped.inc_by(skipped.len() as u64);

        if raw.is_empty() {
            return Ok(IngestOutcome {
                saved_count: 0,
                total_requested,
            });
        }

        m.ingests_in_flight.inc();
        let result = tokio::time::timeout(self.config.ingest_timeout(), async {
            let guard = Arc::clone(&self.ingest_lock).lock_owned().await;
            let received_at = Utc::now();
            // ids are burned even if the append below fails or times out
            let ids = self.ids.reserve(raw.len() as u64);
            let records: Vec<_> = raw
                .iter()
                .zip(ids)
                .map(|(event, id)| normalize_event(event, &project_key, id, received_at))
                .collect();
            let saved = records.len() as u64;

            // once started, an append runs to completion even if the caller
            // stops waiting; the lock is held until it lands
            let store = Arc::clone(&self.store);
            let append = tokio::spawn(async move {
                let _guard = guard;
                store.append_batch(&records).await
            });
            append
                .await
                .map_err(|e| Error::internal(format!("append task failed: {}", e)))??;
            Ok::<_, Error>(saved)
        })
        .await;
        m.ingests_in_flight.dec();
        m.ingest_latency_ms.observe_since(start);

        let saved_count = match result {
            Ok(Ok(saved)) => saved,
            Ok(Err(e)) => {
                m.store_append_errors.inc();
                health().store.set_unhealthy(e.to_string());
                return Err(e);
            }
            Err(_) => {
                m.timeouts.inc();
                warn!(timeout_ms = self.config.ingest_timeout_ms, "Ingest timed out");
                health().ingest.set_unhealthy("ingest deadline exceeded");
                // the append may still land after the deadline
                self.rollups.invalidate_project(&project_key);
                return Err(Error::timeout(format!(
                    "ingest exceeded {}ms",
                    self.config.ingest_timeout_ms
                )));
            }
        };

        health().store.set_healthy();
        health().ingest.set_healthy();
        m.events_saved.inc_by(saved_count);
        self.rollups.invalidate_project(&project_key);

        debug!(saved_count, total_requested, "Batch ingested");
        Ok(IngestOutcome {
            saved_count,
            total_requested,
        })
    }

    /// One page of events, newest first.
    pub async fn list_events(&self, query: EventQuery) -> Result<EventPage> {
        let mut filter = EventFilter::project(&query.project_key).with_range(query.range);
        if let Some(t) = query.event_type.filter(|t| !t.is_empty()) {
            filter = filter.with_type(t);
        }
        let records = self.scan(&filter).await?;
        paginate(records, query.pagination)
    }

    pub async fn event_type_stats(&self, project_key: &str, range: TimeRange) -> Result<Vec<TypeCount>> {
        let records = self
            .scan(&EventFilter::project(project_key).with_range(range))
            .await?;
        Ok(type_counts(&records))
    }

    pub async fn project_stats(&self, project_key: &str, range: TimeRange) -> Result<ProjectStats> {
        let records = self
            .scan(&EventFilter::project(project_key).with_range(range))
            .await?;
        Ok(project_stats(records, self.classifier.as_ref(), &self.offset))
    }

    pub async fn realtime(&self, project_key: &str, minutes: u32) -> Result<RealtimeStats> {
        self.realtime_at(project_key, minutes, Utc::now()).await
    }

    pub async fn realtime_at(
        &self,
        project_key: &str,
        minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<RealtimeStats> {
        let since = now - chrono::Duration::minutes(minutes as i64);
        let records = self
            .scan(&EventFilter::project(project_key).with_range(window(since, now)))
            .await?;
        Ok(realtime_stats(&records, now, minutes, &self.offset))
    }

    pub async fn dashboard(&self, project_key: &str, days: u32) -> Result<Dashboard> {
        self.dashboard_at(project_key, days, Utc::now()).await
    }

    /// Serves cached daily rollups and computes the missing days from a
    /// single scan over the span.
    pub async fn dashboard_at(
        &self,
        project_key: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Dashboard> {
        let span = day_span(timestamp::local_date(&now, &self.offset), days);

        let mut daily = Vec::with_capacity(span.len());
        let mut missing = Vec::new();
        for date in &span {
            match self.rollups.get(project_key, *date).await {
                Some(rollup) => daily.push(Some(rollup)),
                None => {
                    missing.push(daily.len());
                    daily.push(None);
                }
            }
        }

        if let (Some(&first), Some(&last)) = (missing.first(), missing.last()) {
            let bounds = timestamp::day_bounds(span[first], &self.offset)
                .zip(timestamp::day_bounds(span[last], &self.offset));
            let Some(((start, _), (_, end))) = bounds else {
                return Err(Error::internal("dashboard span is out of range"));
            };

            let records = self
                .scan(&EventFilter::project(project_key).with_range(window(start, end)))
                .await?;
            let mut by_day = group_by_day(&records, &self.offset);

            for slot in missing {
                let date = span[slot];
                let rollup = daily_rollup(project_key, date, by_day.remove(&date).unwrap_or_default());
                self.rollups.insert(date, rollup.clone()).await;
                daily[slot] = Some(rollup);
            }
        }

        let since = now - chrono::Duration::minutes(REALTIME_SESSION_MINUTES);
        let recent = self
            .scan(&EventFilter::project(project_key).with_range(window(since, now)))
            .await?;

        Ok(dashboard(
            daily.into_iter().flatten().collect(),
            recent_sessions(&recent, now),
        ))
    }

    /// Store scan under the read timeout.
    async fn scan(&self, filter: &EventFilter) -> Result<Vec<EventRecord>> {
        let start = Instant::now();
        metrics().scans.inc();

        let result = self.with_read_timeout(self.store.scan(filter)).await;
        metrics().query_latency_ms.observe_since(start);

        match &result {
            Ok(records) => {
                health().store.set_healthy();
                debug!(project_key = %filter.project_key, records = records.len(), "Scanned events");
            }
            Err(e @ Error::Store { .. }) => health().store.set_unhealthy(e.to_string()),
            Err(_) => {}
        }
        result
    }

    async fn with_read_timeout<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.config.read_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => {
                metrics().timeouts.inc();
                warn!(timeout_ms = self.config.read_timeout_ms, "Read timed out");
                Err(Error::timeout(format!(
                    "read exceeded {}ms",
                    self.config.read_timeout_ms
                )))
            }
        }
    }
}

fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> TimeRange {
    TimeRange {
        start: Some(timestamp::canonical(&start)),
        end: Some(timestamp::canonical(&end)),
    }
}
