//! Near-duplicate collapsing for page views.
//!
//! Two records are duplicates when they share the second-truncated
//! timestamp, client IP, and page URL. The first occurrence wins. Distinct
//! visitors behind one NATed IP hitting the same page in the same second
//! are merged too; that is an accepted limitation of the key.

use engine_core::{EventRecord, EventType};
use std::collections::HashSet;

/// `<epoch seconds>_<ip or "unknown">_<url>`. Unparseable timestamps use
/// the raw string in place of the second.
pub fn dedup_key(record: &EventRecord) -> String {
    let second = match record.parsed_timestamp() {
        Some(dt) => dt.timestamp().to_string(),
        None => record.timestamp.clone(),
    };
    format!("{}_{}_{}", second, record.ip_or_unknown(), record.page_url)
}

/// Tracks keys seen within one scan.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time a key is seen.
    pub fn first_seen(&mut self, record: &EventRecord) -> bool {
        self.seen.insert(dedup_key(record))
    }
}

/// Records of one type with duplicates removed, input order preserved.
pub fn dedup_by_type<'a>(
    records: impl IntoIterator<Item = &'a EventRecord>,
    kind: EventType,
) -> Vec<&'a EventRecord> {
    let mut dedup = Deduplicator::new();
    records
        .into_iter()
        .filter(|r| r.kind() == kind)
        .filter(|r| dedup.first_seen(r))
        .collect()
}

/// Page views with duplicates removed, input order preserved.
pub fn dedup_pageviews<'a>(
    records: impl IntoIterator<Item = &'a EventRecord>,
) -> Vec<&'a EventRecord> {
    dedup_by_type(records, EventType::Pageview)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pageview(id: u64, ts: &str, ip: &str, url: &str) -> EventRecord {
        EventRecord {
            id,
            event_type: "pageview".into(),
            timestamp: ts.into(),
            user_ip: ip.into(),
            page_url: url.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_same_second_same_ip_same_url_collapses() {
        let records = vec![
            pageview(1, "2024-01-01T10:00:00.100Z", "1.1.1.1", "/a"),
            pageview(2, "2024-01-01T10:00:00.900Z", "1.1.1.1", "/a"),
        ];
        let kept = dedup_pageviews(&records);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 1);
    }

    #[test]
    fn test_any_difference_keeps_both() {
        let records = vec![
            pageview(1, "2024-01-01T10:00:00.000Z", "1.1.1.1", "/a"),
            pageview(2, "2024-01-01T10:00:01.000Z", "1.1.1.1", "/a"),
            pageview(3, "2024-01-01T10:00:00.000Z", "2.2.2.2", "/a"),
            pageview(4, "2024-01-01T10:00:00.000Z", "1.1.1.1", "/b"),
        ];
        assert_eq!(dedup_pageviews(&records).len(), 4);
    }

    #[test]
    fn test_missing_ip_collides_as_unknown() {
        let records = vec![
            pageview(1, "2024-01-01T10:00:00.000Z", "", "/a"),
            pageview(2, "2024-01-01T10:00:00.500Z", "", "/a"),
        ];
        assert_eq!(dedup_key(&records[0]), "1704103200_unknown_/a");
        assert_eq!(dedup_pageviews(&records).len(), 1);
    }

    #[test]
    fn test_offsets_share_the_same_second() {
        let a = pageview(1, "2024-01-01T10:00:00Z", "ip", "/a");
        let b = pageview(2, "2024-01-01T11:00:00+01:00", "ip", "/a");
        assert_eq!(dedup_key(&a), dedup_key(&b));
    }

    #[test]
    fn test_other_types_are_excluded() {
        let mut click = pageview(1, "2024-01-01T10:00:00Z", "ip", "/a");
        click.event_type = "click".into();
        assert!(dedup_pageviews(&[click]).is_empty());
    }
}
