use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::harness::shutdown::Shutdown;
use crate::harness::wait_group::Completion;
use crate::store::Store;

/// What a participant does with its key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Writer,
    Reader,
    Deleter,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Writer => write!(f, "writer"),
            Role::Reader => write!(f, "reader"),
            Role::Deleter => write!(f, "deleter"),
        }
    }
}

/// Result of a single unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Set { key: String, value: i64 },
    Read { key: String, value: Option<i64> },
    Deleted { key: String, existed: bool },
}

/// Per-participant counts, sent once when the participant exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub sets: usize,
    /// Reads that found their key
    pub hits: usize,
    /// Reads that found nothing
    pub misses: usize,
    pub deletes: usize,
    /// Participants that observed shutdown before finishing their rounds
    pub skipped: usize,
}

impl Tally {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Set { .. } => self.sets += 1,
            Outcome::Read { value: Some(_), .. } => self.hits += 1,
            Outcome::Read { value: None, .. } => self.misses += 1,
            Outcome::Deleted { .. } => self.deletes += 1,
        }
    }

    pub fn merge(&mut self, other: Tally) {
        self.sets += other.sets;
        self.hits += other.hits;
        self.misses += other.misses;
        self.deletes += other.deletes;
        self.skipped += other.skipped;
    }
}

/// One concurrently running unit of work against the shared store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub index: usize,
    pub role: Role,
    pub key: String,
}

impl Participant {
    pub fn new(index: usize, role: Role, key_prefix: &str) -> Self {
        Self {
            index,
            role,
            key: format!("{}{}", key_prefix, index),
        }
    }

    /// Perform one unit of work
    pub fn execute(&self, store: &Store) -> Outcome {
        match self.role {
            Role::Writer => {
                let value = self.index as i64;
                store.set(self.key.as_str(), value);
                debug!("Set {}: {}", self.key, value);
                Outcome::Set {
                    key: self.key.clone(),
                    value,
                }
            }
            Role::Reader => {
                let value = store.get(&self.key);
                match value {
                    Some(v) => debug!("Get {}: {}", self.key, v),
                    None => debug!("Key {} not found", self.key),
                }
                Outcome::Read {
                    key: self.key.clone(),
                    value,
                }
            }
            Role::Deleter => {
                let existed = store.delete(&self.key);
                debug!("Deleted {} (present: {})", self.key, existed);
                Outcome::Deleted {
                    key: self.key.clone(),
                    existed,
                }
            }
        }
    }

    /// Run `rounds` units of work, pausing `interval` between them.
    ///
    /// Every round ends at an await point, even with a zero interval, so the
    /// join timeout and shutdown are serviced while rounds are running.
    /// `done` is held for the whole run and released on every exit path,
    /// including a panic inside the store call.
    pub(crate) async fn run(
        self,
        store: Arc<Store>,
        rounds: usize,
        interval: Duration,
        mut shutdown: Shutdown,
        tallies: mpsc::UnboundedSender<Tally>,
        done: Completion,
    ) {
        let _done = done;
        let mut tally = Tally::default();

        for round in 0..rounds {
            if shutdown.is_shutdown() {
                debug!("{} {} stopping before round {}", self.role, self.index, round);
                tally.skipped += 1;
                break;
            }

            tally.record(&self.execute(&store));

            if round + 1 < rounds {
                if interval.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = shutdown.recv() => {}
                    }
                }
            }
        }

        let _ = tallies.send(tally);
    }
}
