//! Countable join barrier
//!
//! Every participant holds a [`Completion`] obtained from [`WaitGroup::enter`].
//! Dropping it is the only way to signal completion, so the counter can never
//! go below zero and a participant that returns early or panics still counts
//! as finished.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::HarnessError;

/// Waits for a known number of participants to finish
#[derive(Debug, Clone)]
pub struct WaitGroup {
    count: Arc<watch::Sender<usize>>,
}

impl WaitGroup {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            count: Arc::new(tx),
        }
    }

    /// Register one more participant
    pub fn enter(&self) -> Completion {
        self.count.send_modify(|count| *count += 1);
        Completion {
            count: Arc::clone(&self.count),
        }
    }

    /// Participants registered but not yet completed
    pub fn pending(&self) -> usize {
        *self.count.borrow()
    }

    /// Block until every registered participant has completed
    pub async fn wait(&self) {
        let mut rx = self.count.subscribe();
        // the sender lives as long as `self`, so this only resolves on zero
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout`
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<(), HarnessError> {
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(()) => Ok(()),
            Err(_) => self.settle_after_deadline(timeout),
        }
    }

    // The last participant may finish between the deadline and this check.
    fn settle_after_deadline(&self, timeout: Duration) -> Result<(), HarnessError> {
        match self.pending() {
            0 => Ok(()),
            pending => Err(HarnessError::JoinTimeout { pending, timeout }),
        }
    }
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

/// Completion guard for one participant. Signals on drop.
#[derive(Debug)]
#[must_use = "dropping the guard immediately signals completion"]
pub struct Completion {
    count: Arc<watch::Sender<usize>>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.count.send_modify(|count| *count -= 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_wait_on_empty_group_returns() {
        let wg = WaitGroup::new();
        wg.wait().await;
        assert_eq!(wg.pending(), 0);
    }

    #[tokio::test]
    async fn test_enter_and_drop() {
        let wg = WaitGroup::new();
        let a = wg.enter();
        let b = wg.enter();
        assert_eq!(wg.pending(), 2);

        drop(a);
        assert_eq!(wg.pending(), 1);
        drop(b);
        assert_eq!(wg.pending(), 0);

        wg.wait().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_wait_sees_every_completion() {
        let wg = WaitGroup::new();
        let finished = Arc::new(AtomicUsize::new(0));

        for i in 0..32u64 {
            let done = wg.enter();
            let finished = Arc::clone(&finished);
            tokio::spawn(async move {
                let _done = done;
                tokio::time::sleep(Duration::from_millis(i % 5)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }

        wg.wait().await;
        assert_eq!(finished.load(Ordering::SeqCst), 32);
        assert_eq!(wg.pending(), 0);
    }

    #[tokio::test]
    async fn test_partial_completion_does_not_resume() {
        let wg = WaitGroup::new();
        let first = wg.enter();
        let _stuck = wg.enter();

        drop(first);
        let err = wg.wait_timeout(Duration::from_millis(50)).await.unwrap_err();
        assert_eq!(
            err,
            HarnessError::JoinTimeout {
                pending: 1,
                timeout: Duration::from_millis(50),
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_participant_still_completes() {
        let wg = WaitGroup::new();
        let done = wg.enter();

        let handle = tokio::spawn(async move {
            let _done = done;
            panic!("participant failure");
        });

        wg.wait_timeout(Duration::from_secs(5)).await.unwrap();
        assert!(handle.await.unwrap_err().is_panic());
    }

    #[tokio::test]
    async fn test_early_return_still_completes() {
        async fn participant(done: Completion, bail: bool) -> Option<()> {
            let _done = done;
            if bail {
                return None;
            }
            Some(())
        }

        let wg = WaitGroup::new();
        let a = tokio::spawn(participant(wg.enter(), true));
        let b = tokio::spawn(participant(wg.enter(), false));

        wg.wait_timeout(Duration::from_secs(5)).await.unwrap();
        assert_eq!(a.await.unwrap(), None);
        assert_eq!(b.await.unwrap(), Some(()));
    }

    #[test]
    fn test_completion_after_deadline_counts_as_joined() {
        let wg = WaitGroup::new();
        let late = wg.enter();
        let timeout = Duration::from_millis(10);

        assert_eq!(
            wg.settle_after_deadline(timeout),
            Err(HarnessError::JoinTimeout { pending: 1, timeout })
        );

        drop(late);
        assert_eq!(wg.settle_after_deadline(timeout), Ok(()));
    }
}
