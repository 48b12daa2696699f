//! Request-level validation. Everything here fails fast, before any store
//! access.

use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::error::{Error, Result, ValidationErrorCode};
use crate::limits::{
    DEFAULT_DASHBOARD_DAYS, DEFAULT_PAGE_SIZE, DEFAULT_REALTIME_MINUTES, MAX_BATCH_EVENTS,
    MAX_BATCH_SIZE_BYTES, MAX_DASHBOARD_DAYS, MAX_PAGE_SIZE, MAX_PROJECT_KEY_LEN,
    MAX_REALTIME_MINUTES,
};
use crate::timestamp;

/// Validates raw batch size BEFORE deserialization.
///
/// Call this first to prevent allocation attacks from oversized payloads.
pub fn validate_batch_size(raw_bytes: &[u8]) -> Result<()> {
    if raw_bytes.len() > MAX_BATCH_SIZE_BYTES {
        return Err(Error::validation_code(
            ValidationErrorCode::BatchTooLarge,
            format!(
                "batch {}KB exceeds {}KB limit",
                raw_bytes.len() / 1024,
                MAX_BATCH_SIZE_BYTES / 1024
            ),
        ));
    }
    Ok(())
}

/// A validated ingest request. Events are still untyped JSON; each one is
/// parsed individually so a bad element only skips itself.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[validate(length(min = 1, max = 100))]
    pub project_key: String,
    #[validate(length(max = 1000))]
    pub events: Vec<Value>,
}

impl IngestRequest {
    /// Parses and validates an ingest body.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        validate_batch_size(bytes)?;

        let value: Value = serde_json::from_slice(bytes).map_err(|e| {
            Error::validation_code(
                ValidationErrorCode::InvalidFormat,
                format!("invalid JSON: {}", e),
            )
        })?;

        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut obj) = value else {
            return Err(Error::validation_code(
                ValidationErrorCode::InvalidFormat,
                "request body must be a JSON object",
            ));
        };

        let project_key = match obj.remove("projectKey") {
            Some(Value::String(key)) => key,
            _ => {
                return Err(Error::validation_code(
                    ValidationErrorCode::InvalidProjectKey,
                    "projectKey must be a non-empty string",
                ))
            }
        };

        let events = match obj.remove("events") {
            Some(Value::Array(events)) => events,
            _ => {
                return Err(Error::validation_code(
                    ValidationErrorCode::InvalidFormat,
                    "events must be an array",
                ))
            }
        };

        let request = Self {
            project_key,
            events,
        };
        request.check()?;
        Ok(request)
    }

    /// Re-runs field validation on a request built by hand.
    pub fn check(&self) -> Result<()> {
        let Err(errors) = self.validate() else {
            return Ok(());
        };
        let fields = errors.field_errors();

        if fields.contains_key("project_key") {
            return Err(Error::validation_code(
                ValidationErrorCode::InvalidProjectKey,
                format!(
                    "projectKey must be a non-empty string of at most {} characters",
                    MAX_PROJECT_KEY_LEN
                ),
            ));
        }
        if fields.contains_key("events") {
            return Err(Error::validation_code(
                ValidationErrorCode::BatchTooLarge,
                format!(
                    "batch of {} events exceeds limit of {}",
                    self.events.len(),
                    MAX_BATCH_EVENTS
                ),
            ));
        }
        Err(Error::validation(errors.to_string()))
    }
}

/// Read-side project key check.
pub fn validate_project_key(key: &str) -> Result<()> {
    if key.trim().is_empty() || key.chars().count() > MAX_PROJECT_KEY_LEN {
        return Err(Error::validation_code(
            ValidationErrorCode::InvalidProjectKey,
            "projectKey must be a non-empty string",
        ));
    }
    Ok(())
}

/// Inclusive time bounds in canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl TimeRange {
    /// Canonicalizes optional bounds. Empty strings count as absent.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let start = canonical_bound("startTime", start)?;
        let end = canonical_bound("endTime", end)?;

        if let (Some(s), Some(e)) = (&start, &end) {
            if s > e {
                return Err(Error::validation_code(
                    ValidationErrorCode::InvalidTimeRange,
                    "startTime must not be after endTime",
                ));
            }
        }

        Ok(Self { start, end })
    }

    /// Inclusive string comparison on canonical timestamps.
    pub fn contains(&self, ts: &str) -> bool {
        self.start.as_deref().map_or(true, |s| ts >= s)
            && self.end.as_deref().map_or(true, |e| ts <= e)
    }
}

fn canonical_bound(name: &str, raw: Option<&str>) -> Result<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => timestamp::canonicalize(value).map(Some).ok_or_else(|| {
            Error::validation_code(
                ValidationErrorCode::InvalidTimeRange,
                format!("{} is not a valid ISO-8601 timestamp: {}", name, value),
            )
        }),
    }
}

/// Page/pageSize for event listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    /// Page is at least 1; page size defaults to 20 and is clamped to 1..=100.
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page.unwrap_or(1).clamp(1, u32::MAX as i64) as u32;
        let page_size = page_size
            .unwrap_or(DEFAULT_PAGE_SIZE as i64)
            .clamp(1, MAX_PAGE_SIZE as i64) as u32;
        Self { page, page_size }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.page_size as usize)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Realtime lookback in minutes, 1..=7 days. Defaults to 5.
pub fn realtime_minutes(minutes: Option<i64>) -> Result<u32> {
    bounded_param("minutes", minutes, DEFAULT_REALTIME_MINUTES, MAX_REALTIME_MINUTES)
}

/// Dashboard span in days, 1..=90. Defaults to 7.
pub fn dashboard_days(days: Option<i64>) -> Result<u32> {
    bounded_param("days", days, DEFAULT_DASHBOARD_DAYS, MAX_DASHBOARD_DAYS)
}

fn bounded_param(name: &str, value: Option<i64>, default: u32, max: u32) -> Result<u32> {
    match value {
        None => Ok(default),
        Some(v) if (1..=max as i64).contains(&v) => Ok(v as u32),
        Some(v) => Err(Error::validation_code(
            ValidationErrorCode::InvalidFormat,
            format!("{} must be between 1 and {}, got {}", name, max, v),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn code_of(err: Error) -> &'static str {
        err.error_code().unwrap_or("none")
    }

    #[test]
    fn test_valid_request() {
        let req = IngestRequest::from_value(json!({
            "projectKey": "p1",
            "events": [{"type": "pageview"}, 3]
        }))
        .unwrap();
        assert_eq!(req.project_key, "p1");
        assert_eq!(req.events.len(), 2);
    }

    #[test]
    fn test_project_key_rules() {
        let empty = IngestRequest::from_value(json!({"projectKey": "", "events": []}));
        assert_eq!(code_of(empty.unwrap_err()), "VALID_003");

        let numeric = IngestRequest::from_value(json!({"projectKey": 5, "events": []}));
        assert_eq!(code_of(numeric.unwrap_err()), "VALID_003");

        let long = IngestRequest::from_value(json!({"projectKey": "k".repeat(101), "events": []}));
        assert_eq!(code_of(long.unwrap_err()), "VALID_003");

        assert!(validate_project_key("  ").is_err());
        assert!(validate_project_key("p1").is_ok());
    }

    #[test]
    fn test_batch_cap() {
        let at_cap = vec![json!({}); 1000];
        assert!(IngestRequest::from_value(json!({"projectKey": "p", "events": at_cap})).is_ok());

        let over = vec![json!({}); 1001];
        let err = IngestRequest::from_value(json!({"projectKey": "p", "events": over})).unwrap_err();
        assert_eq!(code_of(err), "VALID_002");
    }

    #[test]
    fn test_malformed_bodies() {
        assert_eq!(code_of(IngestRequest::parse(b"{not json").unwrap_err()), "VALID_001");
        assert_eq!(code_of(IngestRequest::parse(b"[]").unwrap_err()), "VALID_001");
        let no_events = IngestRequest::parse(br#"{"projectKey":"p","events":{}}"#);
        assert_eq!(code_of(no_events.unwrap_err()), "VALID_001");

        let huge = vec![b' '; MAX_BATCH_SIZE_BYTES + 1];
        assert_eq!(code_of(IngestRequest::parse(&huge).unwrap_err()), "VALID_002");
    }

    #[test]
    fn test_time_range() {
        let range = TimeRange::parse(Some("2024-01-01T00:00:00Z"), Some("2024-01-02")).unwrap();
        assert_eq!(range.start.as_deref(), Some("2024-01-01T00:00:00.000Z"));
        assert!(range.contains("2024-01-01T00:00:00.000Z"));
        assert!(range.contains("2024-01-02T00:00:00.000Z"));
        assert!(!range.contains("2024-01-02T00:00:00.001Z"));

        assert_eq!(TimeRange::parse(None, Some("")).unwrap(), TimeRange::default());

        let inverted = TimeRange::parse(Some("2024-02-01"), Some("2024-01-01"));
        assert_eq!(code_of(inverted.unwrap_err()), "VALID_004");
        let garbage = TimeRange::parse(Some("soon"), None);
        assert_eq!(code_of(garbage.unwrap_err()), "VALID_004");
    }

    #[test]
    fn test_pagination_bounds() {
        assert_eq!(Pagination::default(), Pagination { page: 1, page_size: 20 });
        let p = Pagination::new(Some(0), Some(500));
        assert_eq!((p.page, p.page_size), (1, 100));
        assert_eq!(Pagination::new(Some(3), Some(10)).offset(), 20);
        assert_eq!(Pagination::new(None, Some(-1)).page_size, 1);
    }

    #[test]
    fn test_query_param_bounds() {
        assert_eq!(realtime_minutes(None).unwrap(), 5);
        assert_eq!(realtime_minutes(Some(30)).unwrap(), 30);
        assert!(realtime_minutes(Some(0)).is_err());
        assert!(realtime_minutes(Some(10_081)).is_err());
        assert_eq!(dashboard_days(None).unwrap(), 7);
        assert!(dashboard_days(Some(91)).is_err());
    }
}
