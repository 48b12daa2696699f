//! Analytics over stored events: deduplication, aggregate reports, realtime
//! windows, daily rollups, and the [`Pipeline`] that ties ingestion and
//! queries to an event store.

pub mod config;
pub mod dedup;
pub mod devices;
pub mod errors;
pub mod listing;
pub mod pages;
pub mod pipeline;
pub mod realtime;
pub mod report;
pub mod rollup;
pub mod trend;
pub mod user_agent;
pub mod vitals;

pub use config::PipelineConfig;
pub use listing::{EventPage, TypeCount};
pub use pipeline::{EventQuery, IngestOutcome, Pipeline};
pub use realtime::RealtimeStats;
pub use report::ProjectStats;
pub use rollup::{Dashboard, DailyRollup};
pub use user_agent::{ClassifierKind, UserAgentClassifier};
