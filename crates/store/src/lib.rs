//! Append-only event storage.
//!
//! Records are never updated or deleted; corrections are new events.

pub mod config;
pub mod file;
pub mod health;
pub mod memory;
pub mod sequence;
pub mod store;

pub use config::{open_store, StoreBackend, StoreConfig};
pub use file::FileEventStore;
pub use memory::MemoryEventStore;
pub use sequence::IdSequence;
pub use store::{EventFilter, EventStore};
