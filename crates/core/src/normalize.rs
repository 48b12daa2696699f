//! Inbound event parsing and normalization into storage records.
//!
//! This module handles:
//! - Accepting loosely-typed client events (camelCase, nested `page`/`user`)
//! - Truncating every string field and clamping every numeric field
//! - Canonicalizing client timestamps
//! - Deriving path/host from absolute page URLs

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use crate::error::{Error, Result};
use crate::events::EventRecord;
use crate::limits::*;
use crate::timestamp;

/// Page block of a client event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPage {
    pub url: Value,
    pub path: Value,
    pub title: Value,
    pub host: Value,
}

/// User/client block of a client event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawUser {
    pub ip: Value,
    pub user_agent: Value,
    pub language: Value,
    pub platform: Value,
    pub screen_width: Value,
    pub screen_height: Value,
    pub viewport_width: Value,
    pub viewport_height: Value,
    pub referrer: Value,
}

/// An event as sent by the tracking snippet.
///
/// Scalars stay as raw JSON values; coercion happens in [`normalize_event`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: Value,
    pub timestamp: Value,
    pub page: RawPage,
    pub user: RawUser,
    pub data: Value,
    pub visitor_id: Value,
    pub session_id: Value,
    pub entry_page: Value,
    pub source: Value,
    pub search_keyword: Value,
    pub visit_duration: Value,
    pub page_count: Value,
    pub region: Value,
}

impl RawEvent {
    /// Accepts one element of an inbound `events` array.
    ///
    /// Non-objects are rejected and the caller skips them. A `page` or
    /// `user` block that is not an object is treated as absent.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Err(Error::malformed(format!(
                    "expected an event object, got {}",
                    json_kind(&other)
                )))
            }
        };
        for block in ["page", "user"] {
            if obj.get(block).is_some_and(|v| !v.is_object()) {
                obj.remove(block);
            }
        }
        serde_json::from_value(Value::Object(obj))
            .map_err(|e| Error::malformed(format!("invalid event shape: {}", e)))
    }
}

/// Parses the elements of an `events` array, keeping the index of each
/// rejected element for logging.
pub fn parse_events(values: Vec<Value>) -> (Vec<RawEvent>, Vec<(usize, Error)>) {
    let mut events = Vec::with_capacity(values.len());
    let mut skipped = Vec::new();

    for (i, value) in values.into_iter().enumerate() {
        match RawEvent::from_value(value) {
            Ok(event) => events.push(event),
            Err(e) => skipped.push((i, e)),
        }
    }

    (events, skipped)
}

/// Maps a raw event to a storage-safe record. Never fails: every field has
/// a safe default.
pub fn normalize_event(
    raw: &RawEvent,
    project_key: &str,
    id: u64,
    received_at: DateTime<Utc>,
) -> EventRecord {
    let page_url = bounded(&raw.page.url, MAX_URL_LEN);
    let parsed_url = Url::parse(&page_url).ok();

    let mut page_path = bounded(&raw.page.path, MAX_PATH_LEN);
    let mut page_host = bounded(&raw.page.host, MAX_HOST_LEN);
    if let Some(url) = parsed_url.as_ref() {
        if page_path.is_empty() {
            page_path = truncate(url.path(), MAX_PATH_LEN);
        }
        if page_host.is_empty() {
            page_host = truncate(url.host_str().unwrap_or_default(), MAX_HOST_LEN);
        }
    }

    let event_type = match bounded(&raw.event_type, MAX_TYPE_LEN) {
        t if t.is_empty() => "unknown".to_string(),
        t => t,
    };

    EventRecord {
        id,
        project_key: truncate(project_key, MAX_PROJECT_KEY_LEN),
        event_type,
        timestamp: normalize_timestamp(&raw.timestamp, received_at),
        page_url,
        page_path,
        page_title: bounded(&raw.page.title, MAX_TITLE_LEN),
        page_host,
        user_ip: bounded(&raw.user.ip, MAX_IP_LEN),
        user_agent: bounded(&raw.user.user_agent, MAX_USER_AGENT_LEN),
        user_language: bounded(&raw.user.language, MAX_LANGUAGE_LEN),
        user_platform: bounded(&raw.user.platform, MAX_PLATFORM_LEN),
        screen_width: coerce_int(&raw.user.screen_width, MAX_SCREEN_SIZE),
        screen_height: coerce_int(&raw.user.screen_height, MAX_SCREEN_SIZE),
        viewport_width: coerce_int(&raw.user.viewport_width, MAX_SCREEN_SIZE),
        viewport_height: coerce_int(&raw.user.viewport_height, MAX_SCREEN_SIZE),
        referrer: bounded(&raw.user.referrer, MAX_REFERRER_LEN),
        event_data: serialize_data(&raw.data),
        created_at: timestamp::canonical(&received_at),
        visitor_id: bounded(&raw.visitor_id, MAX_VISITOR_ID_LEN),
        session_id: bounded(&raw.session_id, MAX_SESSION_ID_LEN),
        entry_page: bounded(&raw.entry_page, MAX_ENTRY_PAGE_LEN),
        source: bounded(&raw.source, MAX_SOURCE_LEN),
        search_keyword: bounded(&raw.search_keyword, MAX_SEARCH_KEYWORD_LEN),
        visit_duration: coerce_int(&raw.visit_duration, MAX_COUNTER),
        page_count: coerce_int(&raw.page_count, MAX_COUNTER),
        // geolocation is not resolved
        region: String::new(),
    }
}

/// Truncates to at most `max` characters.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Lenient integer coercion: numbers are truncated toward zero, strings
/// contribute their leading integer prefix, anything else is 0. The result
/// is clamped to `[0, max]`.
pub fn coerce_int(value: &Value, max: u64) -> u64 {
    let n: i128 = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i as i128
            } else if let Some(u) = n.as_u64() {
                u as i128
            } else {
                n.as_f64().map(float_to_int).unwrap_or(0)
            }
        }
        Value::String(s) => leading_int(s),
        _ => 0,
    };
    n.clamp(0, max as i128) as u64
}

fn float_to_int(f: f64) -> i128 {
    if f.is_finite() {
        f.trunc() as i128
    } else {
        0
    }
}

fn leading_int(s: &str) -> i128 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    // saturate very long digit runs; the caller clamps anyway
    let magnitude = digits[..end.min(30)].parse::<i128>().unwrap_or(0);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

fn bounded(value: &Value, max: usize) -> String {
    truncate(&text(value), max)
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn normalize_timestamp(value: &Value, received_at: DateTime<Utc>) -> String {
    match value {
        Value::String(s) if !s.trim().is_empty() => {
            timestamp::canonicalize(s).unwrap_or_else(|| truncate(s, MAX_TIMESTAMP_LEN))
        }
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .and_then(timestamp::from_epoch_millis)
            .map(|dt| timestamp::canonical(&dt))
            .unwrap_or_else(|| timestamp::canonical(&received_at)),
        _ => timestamp::canonical(&received_at),
    }
}

fn serialize_data(data: &Value) -> String {
    let data = match data {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    let json = serde_json::to_string(&data).unwrap_or_else(|_| "{}".to_string());
    truncate(&json, MAX_EVENT_DATA_LEN)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
