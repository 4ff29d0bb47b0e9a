//! Scalable, pausable simulation clock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeDelta};
use parking_lot::Mutex;
use tracing::info;

/// Source of wall-clock instants for a [`VirtualClock`].
pub trait TimeSource: Send + Sync {
    /// Returns the current wall-clock instant.
    fn now(&self) -> Instant;
}

/// Reads the operating system's monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct WallTime;

impl TimeSource for WallTime {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A time source that only moves when told to.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use houseload_sim::sim::clock::{ManualTime, VirtualClock};
///
/// let time = Arc::new(ManualTime::new());
/// let clock = VirtualClock::with_source(2.0, time.clone());
///
/// time.advance(Duration::from_secs(3));
/// assert_eq!(clock.elapsed(), 6.0);
/// ```
#[derive(Debug)]
pub struct ManualTime {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves the source forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }

    /// Moves the source forward by a fractional number of seconds.
    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs.max(0.0)));
    }
}

impl Default for ManualTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

#[derive(Debug, Default)]
struct PauseState {
    paused_at: Option<Instant>,
    paused_total: Duration,
}

/// Virtual simulation time derived from wall-clock reads.
///
/// Elapsed simulation seconds are `(now - start - paused) * scale`, where
/// `now` is frozen at the pause instant while paused. The clock is shared
/// between the aggregation task and whoever pauses or resumes it, so all
/// methods take `&self`.
pub struct VirtualClock {
    source: Arc<dyn TimeSource>,
    scale: f64,
    start: Instant,
    wall_start: DateTime<Local>,
    state: Mutex<PauseState>,
}

impl VirtualClock {
    /// Creates a running clock backed by the system clock.
    ///
    /// # Arguments
    ///
    /// * `scale` - Simulation seconds per real second
    ///
    /// # Panics
    ///
    /// Panics if `scale` is not a finite positive number.
    pub fn new(scale: f64) -> Self {
        Self::with_source(scale, Arc::new(WallTime))
    }

    /// Creates a running clock backed by an arbitrary time source.
    ///
    /// # Panics
    ///
    /// Panics if `scale` is not a finite positive number.
    pub fn with_source(scale: f64, source: Arc<dyn TimeSource>) -> Self {
        assert!(scale.is_finite() && scale > 0.0, "scale must be > 0");
        let start = source.now();
        Self {
            source,
            scale,
            start,
            wall_start: Local::now(),
            state: Mutex::new(PauseState::default()),
        }
    }

    /// Elapsed simulation time in seconds.
    pub fn elapsed(&self) -> f64 {
        let state = self.state.lock();
        let reference = state.paused_at.unwrap_or_else(|| self.source.now());
        let running = reference
            .saturating_duration_since(self.start)
            .saturating_sub(state.paused_total);
        running.as_secs_f64() * self.scale
    }

    /// Wall-clock "now" shifted forward by the elapsed simulation time.
    ///
    /// Only used for display; none of the engine math depends on it.
    pub fn current_time(&self) -> DateTime<Local> {
        let real = self.source.now().saturating_duration_since(self.start);
        let wall_now = self.wall_start + TimeDelta::from_std(real).unwrap_or(TimeDelta::zero());
        let sim_ms = (self.elapsed() * 1000.0) as i64;
        wall_now + TimeDelta::try_milliseconds(sim_ms).unwrap_or(TimeDelta::zero())
    }

    /// Current simulation time of day as `HH:MM:SS`.
    pub fn time_of_day(&self) -> String {
        self.current_time().format("%H:%M:%S").to_string()
    }

    /// Freezes simulation time. Calling it while paused has no effect.
    pub fn pause(&self) {
        let mut state = self.state.lock();
        if state.paused_at.is_none() {
            state.paused_at = Some(self.source.now());
            info!("simulation clock paused");
        }
    }

    /// Resumes simulation time, excluding the paused interval.
    /// Calling it while running has no effect.
    pub fn resume(&self) {
        let mut state = self.state.lock();
        if let Some(paused_at) = state.paused_at.take() {
            let paused_for = self.source.now().saturating_duration_since(paused_at);
            state.paused_total += paused_for;
            info!(paused_secs = paused_for.as_secs_f64(), "simulation clock resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused_at.is_some()
    }

    /// Simulation seconds per real second.
    pub fn scale(&self) -> f64 {
        self.scale
    }
}
