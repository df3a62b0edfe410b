//! Error types for the harness and its configuration
//!
//! Store operations are infallible and have no error type.

use std::time::Duration;
use thiserror::Error;

/// Errors returned while joining launched participants
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HarnessError {
    /// The join deadline passed before every participant signaled completion
    #[error("join timed out after {timeout:?} with {pending} participant(s) still running")]
    JoinTimeout { pending: usize, timeout: Duration },
}

/// Errors raised while loading or validating a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
