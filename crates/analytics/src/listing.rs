//! Paginated event listings and per-type counts.

use engine_core::{EventRecord, Pagination, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    /// Stored records with `event_data` parsed into JSON
    pub data: Vec<Value>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub event_type: String,
    pub count: u64,
}

/// Newest first by timestamp, then by id for records sharing one.
pub fn paginate(mut records: Vec<EventRecord>, pagination: Pagination) -> Result<EventPage> {
    records.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });

    let total = records.len() as u64;
    let page_size = pagination.page_size as u64;
    let data = records
        .into_iter()
        .skip(pagination.offset())
        .take(pagination.page_size as usize)
        .map(listing_row)
        .collect::<Result<Vec<_>>>()?;

    Ok(EventPage {
        data,
        total,
        page: pagination.page,
        page_size: pagination.page_size,
        total_pages: total.div_ceil(page_size),
    })
}

fn listing_row(record: EventRecord) -> Result<Value> {
    let event_data = record.event_data_value();
    let mut row = serde_json::to_value(record)?;
    if let Value::Object(fields) = &mut row {
        fields.insert("event_data".to_string(), event_data);
    }
    Ok(row)
}

/// Count per stored type string, most frequent first, ties by name.
pub fn type_counts(records: &[EventRecord]) -> Vec<TypeCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for record in records {
        *counts.entry(record.event_type.as_str()).or_default() += 1;
    }

    let mut out: Vec<TypeCount> = counts
        .into_iter()
        .map(|(event_type, count)| TypeCount {
            event_type: event_type.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.event_type.cmp(&b.event_type)));
    out
}
