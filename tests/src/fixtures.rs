//! Test fixtures and event generators.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

/// ISO-8601 timestamp the way the tracking snippet sends it.
pub fn iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_iso() -> String {
    iso(Utc::now())
}

/// A page view for `url` from `ip` at `timestamp`.
pub fn pageview(url: &str, ip: &str, timestamp: &str) -> Value {
    json!({
        "type": "pageview",
        "timestamp": timestamp,
        "page": { "url": url, "title": "Test page" },
        "user": {
            "ip": ip,
            "userAgent": "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "screenWidth": 1920,
            "screenHeight": 1080
        },
        "visitorId": format!("visitor_{}", Uuid::new_v4().simple()),
        "sessionId": format!("session_{}", Uuid::new_v4().simple()),
        "data": { "performance": { "lcp": 1200, "ttfb": 80, "loadTime": 900 } }
    })
}

/// `n` page views on distinct URLs, stamped now.
pub fn pageviews(n: usize) -> Vec<Value> {
    let ts = now_iso();
    (0..n)
        .map(|i| pageview(&format!("https://example.com/page/{}", i), "10.0.0.1", &ts))
        .collect()
}

/// An event of any type with no page or user block.
pub fn bare_event(event_type: &str, timestamp: &str) -> Value {
    json!({ "type": event_type, "timestamp": timestamp })
}

/// A script error with the given message and stack.
pub fn error_event(message: &str, stack: &str, timestamp: &str) -> Value {
    json!({
        "type": "error",
        "timestamp": timestamp,
        "page": { "url": "https://example.com/checkout" },
        "data": { "message": message, "stack": stack, "lineno": 42 }
    })
}

/// Ingest request body.
pub fn batch(project_key: &str, events: Vec<Value>) -> Value {
    json!({ "projectKey": project_key, "events": events })
}

/// Unique project key so tests sharing a store never see each other's data.
pub fn project_key() -> String {
    format!("proj_{}", Uuid::new_v4().simple())
}

/// A batch over the 1000 event cap.
pub fn oversized_batch(project_key: &str) -> Value {
    batch(project_key, pageviews(1001))
}
