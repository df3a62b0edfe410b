//! Concurrent in-memory key-value store
//!
//! [`Store`] maps string keys to `i64` values behind a single reader/writer
//! lock. The [`harness`] module fans out writer, reader and deleter
//! participants against a shared store and joins them before a [`Report`]
//! reads the final state.

pub mod config;
pub mod error;
pub mod harness;
pub mod report;
pub mod store;

pub use config::{Config, HarnessConfig, LaunchOrder, LogConfig};
pub use error::{ConfigError, HarnessError};
pub use harness::{Harness, Launched, Outcome, Participant, Role, Tally};
pub use report::Report;
pub use store::Store;
