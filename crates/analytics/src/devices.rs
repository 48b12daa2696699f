//! Device, browser, and OS frequency maps.

use engine_core::EventRecord;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::user_agent::UserAgentClassifier;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceBreakdown {
    pub devices: BTreeMap<String, u64>,
    pub browsers: BTreeMap<String, u64>,
    pub os: BTreeMap<String, u64>,
}

/// Classifies each record's user agent. Callers pass deduplicated page views.
pub fn device_breakdown<'a>(
    records: impl IntoIterator<Item = &'a EventRecord>,
    classifier: &dyn UserAgentClassifier,
) -> DeviceBreakdown {
    let mut breakdown = DeviceBreakdown::default();
    for record in records {
        let profile = classifier.classify(&record.user_agent);
        *breakdown
            .devices
            .entry(profile.device.as_str().to_string())
            .or_default() += 1;
        *breakdown.browsers.entry(profile.browser.to_string()).or_default() += 1;
        *breakdown.os.entry(profile.os.to_string()).or_default() += 1;
    }
    breakdown
}
