//! Error clustering by message.

use engine_core::{EventRecord, EventType};
use serde::Serialize;
use std::collections::HashMap;

/// Characters of the message used as the group key.
pub const MESSAGE_KEY_LEN: usize = 100;
pub const MAX_SAMPLES: usize = 5;
pub const TOP_ERRORS: usize = 10;

const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSample {
    pub timestamp: String,
    pub page: String,
    pub stack: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorGroup {
    pub message: String,
    pub count: u64,
    pub first_seen: String,
    pub last_seen: String,
    pub samples: Vec<ErrorSample>,
}

/// Groups error events by the first 100 characters of their message and
/// returns the 10 largest groups. Equal counts keep first-seen order.
pub fn aggregate_errors<'a>(records: impl IntoIterator<Item = &'a EventRecord>) -> Vec<ErrorGroup> {
    let mut groups: Vec<ErrorGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        if record.kind() != EventType::Error {
            continue;
        }

        let payload = record.payload();
        let error = payload.as_error();
        let message = error
            .and_then(|e| e.message.as_deref())
            .filter(|m| !m.is_empty())
            .unwrap_or(UNKNOWN_ERROR);
        let key: String = message.chars().take(MESSAGE_KEY_LEN).collect();

        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(ErrorGroup {
                message: key,
                count: 0,
                first_seen: record.timestamp.clone(),
                last_seen: record.timestamp.clone(),
                samples: Vec::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.count += 1;
        if record.timestamp < group.first_seen {
            group.first_seen = record.timestamp.clone();
        }
        if record.timestamp > group.last_seen {
            group.last_seen = record.timestamp.clone();
        }
        if group.samples.len() < MAX_SAMPLES {
            group.samples.push(ErrorSample {
                timestamp: record.timestamp.clone(),
                page: record.page_url.clone(),
                stack: error.and_then(|e| e.stack.clone()).unwrap_or_default(),
            });
        }
    }

    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups.truncate(TOP_ERRORS);
    groups
}
