//! Daily rollups and the dashboard built from them.
//!
//! Rollups are a cache over the event store, never a source of truth: any
//! entry can be dropped and recomputed from a scan.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use engine_core::{timestamp, EventRecord};
use moka::future::Cache;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::dedup::dedup_pageviews;
use crate::pages::{top_pages, TopPage};

/// Lookback for `realTimeVisitors`.
pub const REALTIME_SESSION_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRollup {
    pub project_key: String,
    /// Local calendar day, `YYYY-MM-DD`
    pub date: String,
    pub page_views: u64,
    /// Distinct visitor ids, falling back to the client IP
    pub unique_visitors: u64,
    pub sessions: u64,
    /// Mean `performance.loadTime` in ms, `None` without samples
    pub avg_load_time: Option<f64>,
    pub top_pages: Vec<TopPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_page_views: u64,
    pub total_unique_visitors: u64,
    pub avg_load_time: f64,
    pub real_time_visitors: u64,
    /// One entry per day in the span, oldest first
    pub daily_stats: Vec<DailyRollup>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Computes one day's rollup from that day's records.
pub fn daily_rollup(project_key: &str, date: NaiveDate, mut records: Vec<&EventRecord>) -> DailyRollup {
    records.sort_by_key(|r| r.id);

    let pageviews = dedup_pageviews(records.iter().copied());

    let mut visitors = HashSet::new();
    let mut sessions = HashSet::new();
    let mut load_total = 0.0;
    let mut load_samples = 0u32;

    for record in &records {
        let visitor = if record.visitor_id.is_empty() {
            record.user_ip.as_str()
        } else {
            record.visitor_id.as_str()
        };
        if !visitor.is_empty() {
            visitors.insert(visitor);
        }
        if !record.session_id.is_empty() {
            sessions.insert(record.session_id.as_str());
        }
        if let Some(load) = record
            .payload()
            .performance()
            .and_then(|p| p.load_time)
            .filter(|v| v.is_finite() && *v > 0.0)
        {
            load_total += load;
            load_samples += 1;
        }
    }

    DailyRollup {
        project_key: project_key.to_string(),
        date: date.format("%Y-%m-%d").to_string(),
        page_views: pageviews.len() as u64,
        unique_visitors: visitors.len() as u64,
        sessions: sessions.len() as u64,
        avg_load_time: (load_samples > 0).then(|| round2(load_total / load_samples as f64)),
        top_pages: top_pages(pageviews),
    }
}

/// The `days` local dates ending at `today`, oldest first.
pub fn day_span(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days as i64)
        .rev()
        .filter_map(|back| today.checked_sub_signed(Duration::days(back)))
        .collect()
}

/// Groups records by local calendar day. Unparseable timestamps are dropped.
pub fn group_by_day<'a>(
    records: &'a [EventRecord],
    offset: &FixedOffset,
) -> HashMap<NaiveDate, Vec<&'a EventRecord>> {
    let mut days: HashMap<NaiveDate, Vec<&EventRecord>> = HashMap::new();
    for record in records {
        if let Some(dt) = record.parsed_timestamp() {
            days.entry(timestamp::local_date(&dt, offset))
                .or_default()
                .push(record);
        }
    }
    days
}

/// Distinct session ids with activity in the last 30 minutes.
pub fn recent_sessions(records: &[EventRecord], now: DateTime<Utc>) -> u64 {
    let since = now - Duration::minutes(REALTIME_SESSION_MINUTES);
    records
        .iter()
        .filter(|r| !r.session_id.is_empty())
        .filter(|r| r.parsed_timestamp().is_some_and(|dt| dt >= since && dt <= now))
        .map(|r| r.session_id.as_str())
        .collect::<HashSet<_>>()
        .len() as u64
}

/// Sums daily rollups. Load time is the mean over days that had samples.
pub fn dashboard(daily_stats: Vec<DailyRollup>, real_time_visitors: u64) -> Dashboard {
    let loads: Vec<f64> = daily_stats.iter().filter_map(|d| d.avg_load_time).collect();
    let avg_load_time = if loads.is_empty() {
        0.0
    } else {
        round2(loads.iter().sum::<f64>() / loads.len() as f64)
    };

    Dashboard {
        total_page_views: daily_stats.iter().map(|d| d.page_views).sum(),
        total_unique_visitors: daily_stats.iter().map(|d| d.unique_visitors).sum(),
        avg_load_time,
        real_time_visitors,
        daily_stats,
    }
}

type RollupKey = (String, NaiveDate);

/// TTL cache of daily rollups keyed by `(project, day)`.
#[derive(Clone)]
pub struct RollupCache {
    cache: Cache<RollupKey, DailyRollup>,
}

impl RollupCache {
    pub fn new(ttl: std::time::Duration, max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .support_invalidation_closures()
                .build(),
        }
    }

    pub async fn get(&self, project_key: &str, date: NaiveDate) -> Option<DailyRollup> {
        self.cache.get(&(project_key.to_string(), date)).await
    }

    pub async fn insert(&self, date: NaiveDate, rollup: DailyRollup) {
        self.cache
            .insert((rollup.project_key.clone(), date), rollup)
            .await;
    }

    /// Drops every cached day of a project. Called after each successful
    /// ingest.
    pub fn invalidate_project(&self, project_key: &str) {
        let project = project_key.to_string();
        match self
            .cache
            .invalidate_entries_if(move |key, _| key.0 == project)
        {
            Ok(_) => debug!(project_key, "Invalidated cached rollups"),
            Err(e) => {
                warn!(project_key, error = %e, "Rollup invalidation failed, clearing cache");
                self.cache.invalidate_all();
            }
        }
    }
}
