//! Combined project statistics.

use chrono::FixedOffset;
use engine_core::{EventRecord, EventType};
use serde::Serialize;

use crate::dedup::{dedup_by_type, dedup_pageviews};
use crate::devices::{device_breakdown, DeviceBreakdown};
use crate::errors::{aggregate_errors, ErrorGroup};
use crate::pages::{top_pages, totals, TopPage, Totals};
use crate::trend::{time_trend, TrendBucket};
use crate::user_agent::UserAgentClassifier;
use crate::vitals::{web_vitals, WebVitals};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    #[serde(flatten)]
    pub totals: Totals,
    pub top_pages: Vec<TopPage>,
    pub web_vitals: WebVitals,
    pub device_stats: DeviceBreakdown,
    pub top_errors: Vec<ErrorGroup>,
    pub time_trend: Vec<TrendBucket>,
}

/// Builds every aggregate from one scan.
///
/// Records are ordered by id first so "first occurrence" in deduplication
/// and tie-breaks means first stored.
pub fn project_stats(
    mut records: Vec<EventRecord>,
    classifier: &dyn UserAgentClassifier,
    offset: &FixedOffset,
) -> ProjectStats {
    records.sort_by_key(|r| r.id);

    let pageviews = dedup_pageviews(&records);
    let performance = dedup_by_type(&records, EventType::Performance);

    ProjectStats {
        totals: totals(&records, pageviews.len()),
        top_pages: top_pages(pageviews.iter().copied()),
        web_vitals: web_vitals(pageviews.iter().chain(performance.iter()).copied()),
        device_stats: device_breakdown(pageviews.iter().copied(), classifier),
        top_errors: aggregate_errors(&records),
        time_trend: time_trend(&records, offset),
    }
}
