//! Expiry Sweeper Background Task
//!
//! Reads never remove expired entries, so a long-running process that caches
//! many distinct keys would grow without bound. The sweeper periodically
//! calls [`CacheStore::sweep_expired`] until told to stop.
//!
//! ```rust
//! use aspectra_cache::{CacheStore, ExpirySweeper};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(CacheStore::new());
//! let handle = ExpirySweeper::new(store.clone())
//!     .with_interval(Duration::from_secs(30))
//!     .spawn();
//!
//! let snapshot = handle.shutdown().await;
//! assert_eq!(snapshot.removed, 0);
//! # }
//! ```

use crate::store::CacheStore;
use aspectra_core::constants::DEFAULT_SWEEP_INTERVAL_SECS;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Periodic remover of expired cache entries.
#[derive(Debug)]
pub struct ExpirySweeper {
    store: Arc<CacheStore>,
    interval: Duration,
}

impl ExpirySweeper {
    /// Sweep `store` every `DEFAULT_SWEEP_INTERVAL_SECS`.
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self {
            store,
            interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }

    /// Override the sweep interval. Zero is raised to one millisecond.
    pub fn with_interval(mut self, every: Duration) -> Self {
        self.interval = every.max(Duration::from_millis(1));
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start sweeping on the current tokio runtime.
    ///
    /// The first sweep runs immediately.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let counters = Arc::new(SweeperCounters::default());
        let task = tokio::spawn(sweep_task(
            self.store,
            self.interval,
            counters.clone(),
            shutdown_rx,
        ));

        SweeperHandle {
            shutdown_tx,
            counters,
            task,
        }
    }
}

#[derive(Debug, Default)]
struct SweeperCounters {
    cycles: AtomicU64,
    removed: AtomicU64,
}

impl SweeperCounters {
    fn snapshot(&self) -> SweeperSnapshot {
        SweeperSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
        }
    }
}

/// Sweeper activity at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweeperSnapshot {
    /// Completed sweep cycles.
    pub cycles: u64,
    /// Entries removed across all cycles.
    pub removed: u64,
}

/// Owner of a running sweeper.
///
/// Only [`shutdown`](Self::shutdown) stops the task. Dropping the handle
/// detaches it: sweeping continues until the runtime shuts down, and the
/// counters are no longer observable.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    counters: Arc<SweeperCounters>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Current activity without stopping the task.
    pub fn snapshot(&self) -> SweeperSnapshot {
        self.counters.snapshot()
    }

    /// Signal the task to stop and wait for it to finish.
    pub async fn shutdown(self) -> SweeperSnapshot {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Expiry sweeper task ended abnormally");
        }
        self.counters.snapshot()
    }
}

async fn sweep_task(
    store: Arc<CacheStore>,
    every: Duration,
    counters: Arc<SweeperCounters>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(interval_ms = every.as_millis() as u64, "Expiry sweeper started");

    let mut detached = false;

    loop {
        tokio::select! {
            changed = shutdown_rx.changed(), if !detached => {
                match changed {
                    Ok(()) if *shutdown_rx.borrow() => break,
                    Ok(()) => {}
                    Err(_) => {
                        tracing::debug!("Expiry sweeper handle dropped, sweeping detached");
                        detached = true;
                    }
                }
            }

            _ = ticker.tick() => {
                let removed = store.sweep_expired();
                counters.cycles.fetch_add(1, Ordering::Relaxed);
                counters.removed.fetch_add(removed, Ordering::Relaxed);
            }
        }
    }

    let snapshot = counters.snapshot();
    tracing::info!(
        cycles = snapshot.cycles,
        removed = snapshot.removed,
        "Expiry sweeper stopped"
    );
}
