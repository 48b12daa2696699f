//! Core types, schemas, and validation for the analytics engine.

pub mod attribution;
pub mod error;
pub mod events;
pub mod limits;
pub mod normalize;
pub mod schema;
pub mod session;
pub mod timestamp;

pub use error::{Error, Result};
pub use events::*;
pub use normalize::{normalize_event, parse_events, RawEvent};
pub use schema::{IngestRequest, Pagination, TimeRange};
pub use session::*;
