//! Realtime window over the most recent minutes.
//!
//! A pure scan-and-compute: callers poll, and an event appended a moment
//! ago may or may not be counted yet.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use engine_core::{timestamp, EventRecord, EventType};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::dedup::Deduplicator;

/// Window for "online now", independent of the requested lookback.
pub const ONLINE_WINDOW_SECS: i64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WindowCounts {
    pub pageviews: u64,
    pub clicks: u64,
    pub errors: u64,
    /// Distinct non-empty visitor ids
    pub visitors: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MinuteBucket {
    /// `HH:MM` in the configured offset. Carries no date, so windows longer
    /// than a day fold onto the same labels.
    pub time: String,
    pub pageviews: u64,
    pub clicks: u64,
    pub errors: u64,
    pub visitors: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeStats {
    pub minutes: u32,
    pub current: WindowCounts,
    pub timeline: Vec<MinuteBucket>,
    pub online_now: u64,
}

#[derive(Default)]
struct Tally<'a> {
    pageviews: u64,
    clicks: u64,
    errors: u64,
    visitors: HashSet<&'a str>,
}

impl<'a> Tally<'a> {
    fn add(&mut self, record: &'a EventRecord, kind: EventType, fresh_pageview: bool) {
        match kind {
            EventType::Pageview if fresh_pageview => self.pageviews += 1,
            EventType::Click => self.clicks += 1,
            EventType::Error => self.errors += 1,
            _ => {}
        }
        if !record.visitor_id.is_empty() {
            self.visitors.insert(record.visitor_id.as_str());
        }
    }
}

/// Computes window counts for records with timestamps in
/// `[now - minutes, now]`. Records with unparseable timestamps are ignored.
pub fn realtime_stats(
    records: &[EventRecord],
    now: DateTime<Utc>,
    minutes: u32,
    offset: &FixedOffset,
) -> RealtimeStats {
    let window_start = now - Duration::minutes(minutes as i64);
    let online_start = now - Duration::seconds(ONLINE_WINDOW_SECS);

    let mut current = Tally::default();
    let mut buckets: BTreeMap<String, Tally> = BTreeMap::new();
    let mut dedup = Deduplicator::new();
    let mut online: HashSet<&str> = HashSet::new();

    for record in records {
        let Some(dt) = record.parsed_timestamp() else {
            continue;
        };
        if dt < window_start || dt > now {
            continue;
        }

        let kind = record.kind();
        // the dedup key is second-granular, so it never spans two minute buckets
        let fresh = kind == EventType::Pageview && dedup.first_seen(record);

        current.add(record, kind, fresh);
        buckets
            .entry(timestamp::minute_label(&dt, offset))
            .or_default()
            .add(record, kind, fresh);

        if dt >= online_start && !record.visitor_id.is_empty() {
            online.insert(record.visitor_id.as_str());
        }
    }

    RealtimeStats {
        minutes,
        current: WindowCounts {
            pageviews: current.pageviews,
            clicks: current.clicks,
            errors: current.errors,
            visitors: current.visitors.len() as u64,
        },
        timeline: buckets
            .into_iter()
            .map(|(time, t)| MinuteBucket {
                time,
                pageviews: t.pageviews,
                clicks: t.clicks,
                errors: t.errors,
                visitors: t.visitors.len() as u64,
            })
            .collect(),
        online_now: online.len() as u64,
    }
}
