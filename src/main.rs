use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use safekv::{Config, Harness, LaunchOrder, Store};
use tracing::{error, info, warn};

/// Exercise a shared key-value store with concurrent writers, readers and deleters
#[derive(Debug, Parser)]
#[command(name = "safekv", version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[arg(long)]
    writers: Option<usize>,

    #[arg(long)]
    readers: Option<usize>,

    #[arg(long)]
    deleters: Option<usize>,

    /// Units of work per participant
    #[arg(long)]
    rounds: Option<usize>,

    /// Pause between rounds in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Give up joining after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Join each role cohort before launching the next
    #[arg(long)]
    phased: bool,

    /// Randomize launch order within each cohort
    #[arg(long)]
    shuffle: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(Config, bool)> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        let harness = &mut config.harness;
        if let Some(writers) = self.writers {
            harness.writers = writers;
        }
        if let Some(readers) = self.readers {
            harness.readers = readers;
        }
        if let Some(deleters) = self.deleters {
            harness.deleters = deleters;
        }
        if let Some(rounds) = self.rounds {
            harness.rounds = rounds;
        }
        if let Some(interval_ms) = self.interval_ms {
            harness.interval_ms = interval_ms;
        }
        if self.timeout_ms.is_some() {
            harness.join_timeout_ms = self.timeout_ms;
        }
        if self.phased {
            harness.launch_order = LaunchOrder::Phased;
        }
        harness.shuffle |= self.shuffle;
        harness.validate()?;

        if let Some(level) = self.log_level {
            config.log.level = level;
        }

        Ok((config, self.json))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, json) = Args::parse().into_config()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting safekv harness");

    let store = Arc::new(Store::new());
    let harness = Harness::new(Arc::clone(&store), config.harness);
    let settings = harness.config();
    info!(
        "Participants: {} writer(s), {} reader(s), {} deleter(s), {} round(s) each",
        settings.writers, settings.readers, settings.deleters, settings.rounds
    );

    let trigger = harness.shutdown_trigger();
    let interrupted = trigger.clone();
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                warn!("Stop signal received, stopping participants");
                trigger.trigger();
            }
            Err(e) => error!("Failed to listen for stop signals: {}", e),
        }
    });

    let report = harness.run().await.context("harness did not complete")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    if interrupted.is_triggered() {
        warn!("Run was stopped early, report reflects a partial run");
    } else {
        info!("All participants finished");
    }
    Ok(())
}

/// Resolve on Ctrl-C, or on SIGTERM where the platform has it
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
