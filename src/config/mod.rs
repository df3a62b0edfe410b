use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::error::ConfigError;

/// Log configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LogConfig {
  /// Log level, default is "info". `RUST_LOG` takes precedence when set.
  #[serde(default = "default_log_level")]
  pub level: String,
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
    }
  }
}

/// How participant cohorts are started relative to each other
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LaunchOrder {
  /// Writers, readers and deleters all run at once
  #[default]
  Concurrent,
  /// Each role cohort is joined before the next one is launched
  Phased,
}

/// Participant counts and pacing
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
  pub writers: usize,
  pub readers: usize,
  pub deleters: usize,
  /// Keys are derived as `{key_prefix}{index}`
  pub key_prefix: String,
  /// Units of work each participant performs
  pub rounds: usize,
  /// Pause between rounds, in milliseconds
  pub interval_ms: u64,
  /// Give up joining after this many milliseconds. Unset means wait forever.
  pub join_timeout_ms: Option<u64>,
  pub launch_order: LaunchOrder,
  /// Randomize launch order within each cohort
  pub shuffle: bool,
}

impl Default for HarnessConfig {
  fn default() -> Self {
    Self {
      writers: 10,
      readers: 5,
      deleters: 3,
      key_prefix: "key".to_string(),
      rounds: 1,
      interval_ms: 0,
      join_timeout_ms: None,
      launch_order: LaunchOrder::Concurrent,
      shuffle: false,
    }
  }
}

impl HarnessConfig {
  pub fn total(&self) -> usize {
    self.writers + self.readers + self.deleters
  }

  pub fn interval(&self) -> Duration {
    Duration::from_millis(self.interval_ms)
  }

  pub fn join_timeout(&self) -> Option<Duration> {
    self.join_timeout_ms.map(Duration::from_millis)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.rounds == 0 {
      return Err(ConfigError::Invalid("rounds must be at least 1".to_string()));
    }
    if self.key_prefix.is_empty() {
      return Err(ConfigError::Invalid("key_prefix must not be empty".to_string()));
    }
    Ok(())
  }
}

/// Driver configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
  #[serde(default)]
  pub harness: HarnessConfig,

  /// Log configuration
  #[serde(default)]
  pub log: LogConfig,
}

impl Config {
  /// Load configuration from TOML file
  pub fn from_file(path: &str) -> Result<Self, ConfigError> {
    let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_string(),
      source,
    })?;

    let config: Config = toml::from_str(&config_str).map_err(|source| ConfigError::Parse {
      path: path.to_string(),
      source,
    })?;

    config.harness.validate()?;

    Ok(config)
  }
}
