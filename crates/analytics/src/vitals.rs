//! Web Vitals summaries.

use engine_core::{EventRecord, PerformanceMetrics};
use serde::Serialize;

/// Nearest-rank summary of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VitalSummary {
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    /// Mean rounded to the nearest integer.
    pub avg: i64,
    pub count: usize,
}

/// Per-metric summaries; `None` when a metric has no samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebVitals {
    pub lcp: Option<VitalSummary>,
    pub fid: Option<VitalSummary>,
    pub cls: Option<VitalSummary>,
    pub fcp: Option<VitalSummary>,
    pub ttfb: Option<VitalSummary>,
}

/// Summarizes samples. Percentile index is `floor(n * q)`, clamped to the
/// last element.
pub fn summarize(samples: &[f64]) -> Option<VitalSummary> {
    if samples.is_empty() {
        return None;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let at = |q: f64| sorted[((n as f64 * q).floor() as usize).min(n - 1)];
    let mean = sorted.iter().sum::<f64>() / n as f64;

    Some(VitalSummary {
        p50: at(0.5),
        p75: at(0.75),
        p95: at(0.95),
        avg: mean.round() as i64,
        count: n,
    })
}

#[derive(Default)]
struct Samples {
    lcp: Vec<f64>,
    fid: Vec<f64>,
    cls: Vec<f64>,
    fcp: Vec<f64>,
    ttfb: Vec<f64>,
}

impl Samples {
    fn add(&mut self, perf: &PerformanceMetrics) {
        push(&mut self.lcp, perf.lcp);
        push(&mut self.fid, perf.fid);
        push(&mut self.cls, perf.cls);
        push(&mut self.fcp, perf.fcp);
        push(&mut self.ttfb, perf.ttfb);
    }
}

/// Zero and missing values are not samples.
fn push(into: &mut Vec<f64>, value: Option<f64>) {
    if let Some(v) = value.filter(|v| v.is_finite() && *v != 0.0) {
        into.push(v);
    }
}

/// Collects vitals from the `performance` block of each record's payload.
/// Callers pass deduplicated records.
pub fn web_vitals<'a>(records: impl IntoIterator<Item = &'a EventRecord>) -> WebVitals {
    let mut samples = Samples::default();
    for record in records {
        if let Some(perf) = record.payload().performance() {
            samples.add(perf);
        }
    }

    WebVitals {
        lcp: summarize(&samples.lcp),
        fid: summarize(&samples.fid),
        cls: summarize(&samples.cls),
        fcp: summarize(&samples.fcp),
        ttfb: summarize(&samples.ttfb),
    }
}
