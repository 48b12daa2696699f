//! Shared harness for the HTTP integration tests.

pub mod fixtures;
pub mod mocks;
pub mod setup;
