//! Hourly time trend.

use chrono::FixedOffset;
use engine_core::{timestamp, EventRecord, EventType};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::dedup::Deduplicator;

/// Most recent buckets kept.
pub const TREND_BUCKETS: usize = 48;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrendBucket {
    /// `YYYY-MM-DD HH:00` in the configured offset
    pub time: String,
    pub pageviews: u64,
    pub clicks: u64,
    pub errors: u64,
}

/// Buckets page views by local hour. Page views are deduplicated; clicks and
/// errors are raw counts carried on hours that have page views. Records with
/// unparseable timestamps have no hour and are left out. Returns the latest
/// 48 buckets, ascending.
pub fn time_trend(records: &[EventRecord], offset: &FixedOffset) -> Vec<TrendBucket> {
    let mut buckets: BTreeMap<String, TrendBucket> = BTreeMap::new();
    let mut dedup = Deduplicator::new();

    for record in records {
        let kind = record.kind();
        if !matches!(kind, EventType::Pageview | EventType::Click | EventType::Error) {
            continue;
        }
        let Some(dt) = record.parsed_timestamp() else {
            continue;
        };
        if kind == EventType::Pageview && !dedup.first_seen(record) {
            continue;
        }

        let label = timestamp::hour_label(&dt, offset);
        let bucket = buckets.entry(label.clone()).or_insert_with(|| TrendBucket {
            time: label,
            ..Default::default()
        });
        match kind {
            EventType::Pageview => bucket.pageviews += 1,
            EventType::Click => bucket.clicks += 1,
            _ => bucket.errors += 1,
        }
    }

    let with_pageviews: Vec<_> = buckets.into_values().filter(|b| b.pageviews > 0).collect();
    let skip = with_pageviews.len().saturating_sub(TREND_BUCKETS);
    with_pageviews.into_iter().skip(skip).collect()
}
