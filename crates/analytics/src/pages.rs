//! Top pages and report totals.

use engine_core::{EventRecord, EventType};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub const TOP_PAGES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopPage {
    pub url: String,
    pub title: String,
    pub count: u64,
}

/// Counts `(url, title)` pairs and returns the 10 most viewed. Equal
/// counts keep first-seen order. Callers pass deduplicated page views.
pub fn top_pages<'a>(pageviews: impl IntoIterator<Item = &'a EventRecord>) -> Vec<TopPage> {
    let mut pages: Vec<TopPage> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();

    for record in pageviews {
        let key = (record.page_url.as_str(), record.page_title.as_str());
        match index.get(&key) {
            Some(&slot) => pages[slot].count += 1,
            None => {
                index.insert(key, pages.len());
                pages.push(TopPage {
                    url: record.page_url.clone(),
                    title: record.page_title.clone(),
                    count: 1,
                });
            }
        }
    }

    pages.sort_by(|a, b| b.count.cmp(&a.count));
    pages.truncate(TOP_PAGES);
    pages
}

/// Report totals. `total_events`, `unique_visitors` and `unique_pages`
/// count the raw scan; `pageviews` counts deduplicated page views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_events: u64,
    /// Distinct non-empty client IPs
    pub unique_visitors: u64,
    /// Distinct non-empty page URLs
    pub unique_pages: u64,
    pub pageviews: u64,
    pub clicks: u64,
    pub errors: u64,
}

pub fn totals(raw: &[EventRecord], deduped_pageviews: usize) -> Totals {
    let mut ips = HashSet::new();
    let mut urls = HashSet::new();
    let mut clicks = 0;
    let mut errors = 0;

    for record in raw {
        if !record.user_ip.is_empty() {
            ips.insert(record.user_ip.as_str());
        }
        if !record.page_url.is_empty() {
            urls.insert(record.page_url.as_str());
        }
        match record.kind() {
            EventType::Click => clicks += 1,
            EventType::Error => errors += 1,
            _ => {}
        }
    }

    Totals {
        total_events: raw.len() as u64,
        unique_visitors: ips.len() as u64,
        unique_pages: urls.len() as u64,
        pageviews: deduped_pageviews as u64,
        clicks,
        errors,
    }
}
