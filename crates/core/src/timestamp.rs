//! Timestamp parsing, canonical formatting, and bucket labels.
//!
//! Stored timestamps are RFC 3339 UTC with millisecond precision, so
//! plain string comparison orders them correctly.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, SecondsFormat, TimeZone,
    Utc,
};

/// Only four-digit years have a canonical form that sorts as a string.
fn representable(dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (0..=9999).contains(&dt.year()).then_some(dt)
}

/// Parses an ISO-8601 timestamp with any offset. Offset-less values are
/// read as UTC. Instants outside years 0000-9999 are treated as unparseable.
pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    parse_any(raw).and_then(representable)
}

fn parse_any(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Milliseconds since the Unix epoch, within years 0000-9999.
pub fn from_epoch_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single().and_then(representable)
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`
pub fn canonical(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Canonical form of a parseable timestamp string.
pub fn canonicalize(raw: &str) -> Option<String> {
    parse(raw).map(|dt| canonical(&dt))
}

/// Fixed offset for bucket labels. Out-of-range values fall back to UTC.
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
}

/// Hour bucket label, `YYYY-MM-DD HH:00`.
pub fn hour_label(dt: &DateTime<Utc>, offset: &FixedOffset) -> String {
    dt.with_timezone(offset).format("%Y-%m-%d %H:00").to_string()
}

/// Minute bucket label, `HH:MM`. Carries no date.
pub fn minute_label(dt: &DateTime<Utc>, offset: &FixedOffset) -> String {
    dt.with_timezone(offset).format("%H:%M").to_string()
}

/// Calendar day in the given offset.
pub fn local_date(dt: &DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    dt.with_timezone(offset).date_naive()
}

/// UTC bounds `[start, end]` of a local calendar day.
pub fn day_bounds(date: NaiveDate, offset: &FixedOffset) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = offset
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .single()?
        .with_timezone(&Utc);
    let end = offset
        .from_local_datetime(&date.and_hms_milli_opt(23, 59, 59, 999)?)
        .single()?
        .with_timezone(&Utc);
    Some((start, end))
}
