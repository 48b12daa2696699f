//! Stored event records and their type-specific payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::timestamp;

/// Known event types. Stored records keep the raw type string, so
/// anything outside this set still round-trips and is reported as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Pageview,
    Click,
    Error,
    Performance,
    Unknown,
}

impl EventType {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pageview => "pageview",
            Self::Click => "click",
            Self::Error => "error",
            Self::Performance => "performance",
            Self::Unknown => "unknown",
        }
    }

    /// Classifies a stored type string. Unrecognized strings map to `Unknown`.
    pub fn from_type_str(s: &str) -> Self {
        match s {
            "pageview" => Self::Pageview,
            "click" => Self::Click,
            "error" => Self::Error,
            "performance" => Self::Performance,
            _ => Self::Unknown,
        }
    }
}

/// An event as persisted by the event store.
///
/// Every field has a default so records written before a field existed
/// still deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRecord {
    pub id: u64,
    pub project_key: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Client-reported time; canonical RFC 3339 UTC when it could be parsed.
    pub timestamp: String,
    pub page_url: String,
    pub page_path: String,
    pub page_title: String,
    pub page_host: String,
    pub user_ip: String,
    pub user_agent: String,
    pub user_language: String,
    pub user_platform: String,
    pub screen_width: u64,
    pub screen_height: u64,
    pub viewport_width: u64,
    pub viewport_height: u64,
    pub referrer: String,
    /// Serialized JSON payload, possibly truncated mid-document.
    pub event_data: String,
    /// Server receipt time.
    pub created_at: String,
    pub visitor_id: String,
    pub session_id: String,
    pub entry_page: String,
    pub source: String,
    pub search_keyword: String,
    /// Seconds since session start, as reported by the client.
    pub visit_duration: u64,
    pub page_count: u64,
    pub region: String,
}

impl Default for EventRecord {
    fn default() -> Self {
        Self {
            id: 0,
            project_key: String::new(),
            event_type: EventType::Unknown.as_str().to_string(),
            timestamp: String::new(),
            page_url: String::new(),
            page_path: String::new(),
            page_title: String::new(),
            page_host: String::new(),
            user_ip: String::new(),
            user_agent: String::new(),
            user_language: String::new(),
            user_platform: String::new(),
            screen_width: 0,
            screen_height: 0,
            viewport_width: 0,
            viewport_height: 0,
            referrer: String::new(),
            event_data: "{}".to_string(),
            created_at: String::new(),
            visitor_id: String::new(),
            session_id: String::new(),
            entry_page: String::new(),
            source: String::new(),
            search_keyword: String::new(),
            visit_duration: 0,
            page_count: 0,
            region: String::new(),
        }
    }
}

impl EventRecord {
    pub fn kind(&self) -> EventType {
        EventType::from_type_str(&self.event_type)
    }

    /// Parses the stored payload into its type-specific shape.
    pub fn payload(&self) -> EventPayload {
        EventPayload::parse(self.kind(), &self.event_data)
    }

    /// Stored payload as JSON, `{}` when it is not valid JSON.
    pub fn event_data_value(&self) -> Value {
        serde_json::from_str(&self.event_data)
            .unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
    }

    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        timestamp::parse(&self.timestamp)
    }

    /// Client IP, or `"unknown"` when the client did not report one.
    pub fn ip_or_unknown(&self) -> &str {
        if self.user_ip.is_empty() {
            "unknown"
        } else {
            &self.user_ip
        }
    }
}

/// Web Vitals and navigation timings reported by the tracking snippet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceMetrics {
    /// Largest Contentful Paint (ms)
    #[serde(deserialize_with = "lenient::float")]
    pub lcp: Option<f64>,
    /// First Input Delay (ms)
    #[serde(deserialize_with = "lenient::float")]
    pub fid: Option<f64>,
    /// Cumulative Layout Shift
    #[serde(deserialize_with = "lenient::float")]
    pub cls: Option<f64>,
    /// First Contentful Paint (ms)
    #[serde(deserialize_with = "lenient::float")]
    pub fcp: Option<f64>,
    /// Time to First Byte (ms)
    #[serde(deserialize_with = "lenient::float")]
    pub ttfb: Option<f64>,
    /// Full page load (ms)
    #[serde(deserialize_with = "lenient::float")]
    pub load_time: Option<f64>,
    #[serde(deserialize_with = "lenient::float")]
    pub dom_ready_time: Option<f64>,
    #[serde(deserialize_with = "lenient::float")]
    pub dns_time: Option<f64>,
    #[serde(deserialize_with = "lenient::float")]
    pub tcp_time: Option<f64>,
    #[serde(deserialize_with = "lenient::float")]
    pub request_time: Option<f64>,
    #[serde(deserialize_with = "lenient::float")]
    pub response_time: Option<f64>,
    pub resources: Option<Vec<ResourceTiming>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceTiming {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub initiator: Option<String>,
    pub duration: Option<f64>,
    pub size: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageviewPayload {
    pub performance: Option<PerformanceMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformancePayload {
    pub performance: Option<PerformanceMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClickPayload {
    pub element: Option<String>,
    pub id: Option<String>,
    pub class_name: Option<String>,
    pub text: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorPayload {
    #[serde(deserialize_with = "lenient::string")]
    pub message: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub source: Option<String>,
    #[serde(deserialize_with = "lenient::int")]
    pub lineno: Option<i64>,
    #[serde(deserialize_with = "lenient::int")]
    pub colno: Option<i64>,
    #[serde(deserialize_with = "lenient::string")]
    pub stack: Option<String>,
}

/// Field decoders for client-reported scalars. A value of the wrong kind
/// becomes `None` instead of failing the whole payload.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Numbers and numeric strings.
    pub fn float<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite()))
    }

    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(float(d)?.map(|v| v.trunc() as i64))
    }

    /// Strings as-is; numbers and booleans in their JSON form.
    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            v @ (Value::Number(_) | Value::Bool(_)) => Some(v.to_string()),
            _ => None,
        })
    }
}

/// Type-indexed event payload.
///
/// Parsing never fails: a truncated document or a shape that does not match
/// the event type yields `Unknown` holding the raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Pageview(PageviewPayload),
    Performance(PerformancePayload),
    Click(ClickPayload),
    Error(ErrorPayload),
    Unknown(String),
}

impl EventPayload {
    pub fn parse(kind: EventType, raw: &str) -> Self {
        let parsed = match kind {
            EventType::Pageview => serde_json::from_str(raw).map(Self::Pageview),
            EventType::Performance => serde_json::from_str(raw).map(Self::Performance),
            EventType::Click => serde_json::from_str(raw).map(Self::Click),
            EventType::Error => serde_json::from_str(raw).map(Self::Error),
            EventType::Unknown => return Self::Unknown(raw.to_string()),
        };
        parsed.unwrap_or_else(|_| Self::Unknown(raw.to_string()))
    }

    /// Performance metrics carried by pageview or performance payloads.
    pub fn performance(&self) -> Option<&PerformanceMetrics> {
        match self {
            Self::Pageview(p) => p.performance.as_ref(),
            Self::Performance(p) => p.performance.as_ref(),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorPayload> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }
}
