//! Visitor identity and session tracking for the client side of ingestion.
//!
//! The server never owns this state. It receives `visitorId`, `sessionId`,
//! `pageCount` and `entryPage` with each event and trusts them as advisory
//! dimensions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::attribution;

/// Session timeout duration (30 minutes of inactivity).
pub const SESSION_TIMEOUT_MINUTES: i64 = 30;

/// Storage key for the durable visitor id.
pub const VISITOR_ID_KEY: &str = "wpm_visitor_id";

/// Key-value storage on the client. Implementations may be unavailable
/// (private browsing, quota, disabled storage).
pub trait ClientStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Returns false when the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> bool;

    fn is_available(&self) -> bool {
        true
    }
}

/// In-process storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        self.entries.lock().insert(key.to_string(), value.to_string());
        true
    }
}

/// Storage that is never available.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStorage;

impl ClientStorage for UnavailableStorage {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        false
    }
}

fn mint_id(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(13).collect();
    format!("{}_{}_{}", prefix, now.timestamp_millis(), suffix)
}

/// Assigns a visitor id that is stable for as long as storage keeps it.
pub struct IdentityAssigner {
    durable: Arc<dyn ClientStorage>,
    session: Arc<dyn ClientStorage>,
    temporary: Mutex<Option<String>>,
}

impl IdentityAssigner {
    pub fn new(durable: Arc<dyn ClientStorage>, session: Arc<dyn ClientStorage>) -> Self {
        Self {
            durable,
            session,
            temporary: Mutex::new(None),
        }
    }

    /// Durable storage first, then session storage, then a process-local
    /// `temp_` id.
    pub fn visitor_id(&self, now: DateTime<Utc>) -> String {
        for storage in [&self.durable, &self.session] {
            if !storage.is_available() {
                continue;
            }
            if let Some(existing) = storage.get(VISITOR_ID_KEY).filter(|v| !v.is_empty()) {
                return existing;
            }
            let minted = mint_id("visitor", now);
            if storage.set(VISITOR_ID_KEY, &minted) {
                return minted;
            }
        }

        self.temporary
            .lock()
            .get_or_insert_with(|| mint_id("temp", now))
            .clone()
    }
}

/// Persisted session state, stored as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: String,
    /// Epoch millis
    pub start_time: i64,
    /// Epoch millis
    pub last_activity: i64,
    pub page_count: u64,
    pub entry_page: String,
}

/// Tracks one project's session with a 30-minute inactivity timeout.
pub struct SessionTracker {
    storage: Arc<dyn ClientStorage>,
    key: String,
    timeout: Duration,
    memory: Mutex<Option<SessionState>>,
}

impl SessionTracker {
    pub fn new(storage: Arc<dyn ClientStorage>, project_key: &str) -> Self {
        Self {
            storage,
            key: format!("wpm_session_{}", project_key),
            timeout: Duration::minutes(SESSION_TIMEOUT_MINUTES),
            memory: Mutex::new(None),
        }
    }

    /// Records activity at `now`, reusing the current session if it has
    /// not timed out, and returns the updated state.
    pub fn touch(&self, now: DateTime<Utc>, page_url: &str) -> SessionSnapshot {
        let mut memory = self.memory.lock();
        let persisted = if self.storage.is_available() {
            self.storage
                .get(&self.key)
                .and_then(|raw| serde_json::from_str::<SessionState>(&raw).ok())
        } else {
            memory.clone()
        };

        let now_ms = now.timestamp_millis();
        let mut state = match persisted {
            Some(state) if now_ms - state.last_activity < self.timeout.num_milliseconds() => state,
            _ => SessionState {
                session_id: mint_id("session", now),
                start_time: now_ms,
                last_activity: now_ms,
                page_count: 0,
                entry_page: page_url.to_string(),
            },
        };

        state.page_count += 1;
        state.last_activity = now_ms;

        let stored = serde_json::to_string(&state)
            .map(|json| self.storage.set(&self.key, &json))
            .unwrap_or(false);
        if !stored {
            *memory = Some(state.clone());
        }

        SessionSnapshot { state, now }
    }
}

/// Session fields for one outgoing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub now: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Whole seconds since session start.
    pub fn visit_duration_secs(&self) -> u64 {
        let start = Utc
            .timestamp_millis_opt(self.state.start_time)
            .single()
            .unwrap_or(self.now);
        (self.now - start).num_seconds().max(0) as u64
    }

    /// Writes session and attribution fields into an outgoing event object.
    pub fn stamp(&self, event: &mut Map<String, Value>, visitor_id: &str, referrer: &str) {
        let page_url = event
            .get("page")
            .and_then(|p| p.get("url"))
            .and_then(Value::as_str)
            .unwrap_or(&self.state.entry_page)
            .to_string();
        let host = url::Url::parse(&page_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        event.insert("visitorId".into(), Value::from(visitor_id));
        event.insert("sessionId".into(), Value::from(self.state.session_id.as_str()));
        event.insert("entryPage".into(), Value::from(self.state.entry_page.as_str()));
        event.insert("pageCount".into(), Value::from(self.state.page_count));
        event.insert("visitDuration".into(), Value::from(self.visit_duration_secs()));
        event.insert(
            "source".into(),
            Value::from(attribution::traffic_source(referrer, &host)),
        );
        event.insert(
            "searchKeyword".into(),
            Value::from(attribution::search_keyword(&page_url, referrer)),
        );
    }
}
