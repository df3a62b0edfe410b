//! Concurrency harness
//!
//! Launches a fixed set of writer, reader and deleter participants against one
//! shared [`Store`] and joins them through a [`WaitGroup`]. Reporting only
//! happens after the join, when no participant is left running.

pub mod participant;
pub mod shutdown;
pub mod wait_group;

use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{HarnessConfig, LaunchOrder};
use crate::error::HarnessError;
use crate::report::Report;
use crate::store::Store;

pub use participant::{Outcome, Participant, Role, Tally};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use wait_group::{Completion, WaitGroup};

/// Participants launched by [`Harness::launch`] that have not been joined yet
#[derive(Debug)]
pub struct Launched {
    wait_group: WaitGroup,
    tallies: mpsc::UnboundedReceiver<Tally>,
    launched: usize,
}

impl Launched {
    pub fn launched(&self) -> usize {
        self.launched
    }

    pub fn pending(&self) -> usize {
        self.wait_group.pending()
    }

    /// Block until every launched participant has completed
    pub async fn join_all(self) -> Tally {
        self.wait_group.wait().await;
        self.drain()
    }

    /// Block until every launched participant has completed, or `timeout` passes
    pub async fn join_all_timeout(self, timeout: Duration) -> Result<Tally, HarnessError> {
        self.wait_group.wait_timeout(timeout).await?;
        Ok(self.drain())
    }

    async fn join(self, timeout: Option<Duration>) -> Result<Tally, HarnessError> {
        let launched = self.launched;
        info!("Waiting on {} of {} participant(s)", self.pending(), launched);
        let tally = match timeout {
            Some(timeout) => self.join_all_timeout(timeout).await.inspect_err(|e| {
                warn!("Join failed: {}", e);
            })?,
            None => self.join_all().await,
        };
        info!("Joined {} participant(s)", launched);
        Ok(tally)
    }

    // Each participant sends its tally before its completion guard drops, so
    // after the join the channel holds one tally per participant that did not
    // panic.
    fn drain(mut self) -> Tally {
        let mut total = Tally::default();
        while let Ok(tally) = self.tallies.try_recv() {
            total.merge(tally);
        }
        total
    }
}

/// Fan-out/fan-in driver for a shared store
pub struct Harness {
    store: Arc<Store>,
    config: HarnessConfig,
    trigger: ShutdownTrigger,
    shutdown: Shutdown,
}

impl Harness {
    pub fn new(store: Arc<Store>, config: HarnessConfig) -> Self {
        let (trigger, shutdown) = shutdown::channel();
        Self {
            store,
            config,
            trigger,
            shutdown,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Handle that stops every participant at its next checkpoint
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.trigger.clone()
    }

    /// Participants grouped by role: writers, then readers, then deleters
    pub fn cohorts(&self) -> Vec<Vec<Participant>> {
        let prefix = self.config.key_prefix.as_str();
        let mut cohorts: Vec<Vec<Participant>> = [
            (Role::Writer, self.config.writers),
            (Role::Reader, self.config.readers),
            (Role::Deleter, self.config.deleters),
        ]
        .into_iter()
        .map(|(role, count)| {
            (0..count)
                .map(|index| Participant::new(index, role, prefix))
                .collect::<Vec<_>>()
        })
        .collect();

        if self.config.shuffle {
            let mut rng = rand::rng();
            for cohort in &mut cohorts {
                cohort.shuffle(&mut rng);
            }
        }
        cohorts
    }

    /// Launch every participant at once. Must be called inside a tokio runtime.
    pub fn launch(&self) -> Launched {
        self.launch_participants(self.cohorts().into_iter().flatten().collect())
    }

    fn launch_participants(&self, participants: Vec<Participant>) -> Launched {
        let wait_group = WaitGroup::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let launched = participants.len();

        for participant in participants {
            let done = wait_group.enter();
            tokio::spawn(participant.run(
                Arc::clone(&self.store),
                self.config.rounds,
                self.config.interval(),
                self.shutdown.clone(),
                tx.clone(),
                done,
            ));
        }
        info!("Launched {} participant(s)", launched);

        Launched {
            wait_group,
            tallies: rx,
            launched,
        }
    }

    /// Launch, join and report.
    ///
    /// In phased order each cohort is joined before the next starts, and the
    /// join timeout applies per cohort.
    pub async fn run(&self) -> Result<Report, HarnessError> {
        let timeout = self.config.join_timeout();
        let tally = match self.config.launch_order {
            LaunchOrder::Concurrent => self.launch().join(timeout).await?,
            LaunchOrder::Phased => {
                let mut tally = Tally::default();
                for cohort in self.cohorts() {
                    tally.merge(self.launch_participants(cohort).join(timeout).await?);
                }
                tally
            }
        };

        Ok(Report::collect(&self.store, &tally))
    }
}
