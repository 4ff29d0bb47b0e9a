//! Periodic aggregation task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::engine::Simulation;

/// Ticks a [`Simulation`] on a fixed wall-clock cadence.
///
/// The cadence only affects how fresh the readings are; each tick is a
/// full recomputation, so any interval gives correct results.
pub struct Aggregator {
    sim: Arc<Simulation>,
    cadence: Duration,
}

impl Aggregator {
    /// Reference cadence of the house dashboards.
    pub const DEFAULT_CADENCE: Duration = Duration::from_millis(100);

    /// # Panics
    ///
    /// Panics if `cadence` is zero.
    pub fn new(sim: Arc<Simulation>, cadence: Duration) -> Self {
        assert!(!cadence.is_zero(), "cadence must be > 0");
        Self { sim, cadence }
    }

    /// Starts ticking on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(self) -> AggregatorHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let ticks = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(self.run(stop_rx, ticks.clone()));
        AggregatorHandle {
            stop: stop_tx,
            task,
            ticks,
        }
    }

    async fn run(self, mut stop: watch::Receiver<bool>, ticks: Arc<AtomicU64>) {
        info!(cadence_ms = self.cadence.as_millis() as u64, "aggregator started");
        let mut interval = tokio::time::interval(self.cadence);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let snapshot = self.sim.tick();
                    let n = ticks.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(
                        tick = n,
                        sim_secs = snapshot.sim_secs,
                        total_w = snapshot.watts,
                        faults = snapshot.faults.len(),
                        "tick"
                    );
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
        info!(ticks = ticks.load(Ordering::Relaxed), "aggregator stopped");
    }
}

/// Handle to a running [`Aggregator`].
pub struct AggregatorHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    ticks: Arc<AtomicU64>,
}

impl AggregatorHandle {
    /// Number of ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Stops ticking and waits for the task to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "aggregator task ended abnormally");
        }
    }
}
