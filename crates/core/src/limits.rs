//! Size and value limits for the analytics engine.
//!
//! The normalizer is the only writer of stored records, and it applies every
//! bound in this module. Readers may rely on them holding for all stored
//! records.

// === Batch Limits ===

/// Maximum request payload size in bytes (1MB).
///
/// Checked before parsing so an oversized body is never deserialized.
pub const MAX_BATCH_SIZE_BYTES: usize = 1024 * 1024;

/// Maximum events per ingest request. Larger batches are rejected wholesale.
pub const MAX_BATCH_EVENTS: usize = 1000;

// === String Field Limits (chars) ===

pub const MAX_PROJECT_KEY_LEN: usize = 100;
pub const MAX_TYPE_LEN: usize = 50;
pub const MAX_URL_LEN: usize = 500;
pub const MAX_PATH_LEN: usize = 500;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_HOST_LEN: usize = 200;
pub const MAX_IP_LEN: usize = 50;
pub const MAX_USER_AGENT_LEN: usize = 500;
pub const MAX_LANGUAGE_LEN: usize = 50;
pub const MAX_PLATFORM_LEN: usize = 50;
pub const MAX_REFERRER_LEN: usize = 500;
pub const MAX_VISITOR_ID_LEN: usize = 100;
pub const MAX_SESSION_ID_LEN: usize = 100;
pub const MAX_ENTRY_PAGE_LEN: usize = 500;
pub const MAX_SOURCE_LEN: usize = 200;
pub const MAX_SEARCH_KEYWORD_LEN: usize = 200;
pub const MAX_REGION_LEN: usize = 100;

/// Serialized event payload max length.
///
/// Truncation can cut a JSON document mid-structure; readers parse
/// defensively and fall back to `{}`.
pub const MAX_EVENT_DATA_LEN: usize = 5000;

/// Unparseable client timestamps are kept verbatim up to this length.
pub const MAX_TIMESTAMP_LEN: usize = 64;

// === Numeric Bounds ===

/// Screen and viewport dimensions are clamped to `[0, MAX_SCREEN_SIZE]`.
pub const MAX_SCREEN_SIZE: u64 = 99_999;

/// Durations and counters are clamped to `[0, MAX_COUNTER]`
/// (2^53 - 1, the largest integer a JSON client can represent exactly).
pub const MAX_COUNTER: u64 = 9_007_199_254_740_991;

// === Query Bounds ===

/// Default page size for event listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Maximum page size for event listings.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default realtime lookback in minutes.
pub const DEFAULT_REALTIME_MINUTES: u32 = 5;

/// Maximum realtime lookback in minutes (7 days).
pub const MAX_REALTIME_MINUTES: u32 = 7 * 24 * 60;

/// Default dashboard span in days.
pub const DEFAULT_DASHBOARD_DAYS: u32 = 7;

/// Maximum dashboard span in days.
pub const MAX_DASHBOARD_DAYS: u32 = 90;
